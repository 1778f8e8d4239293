use tlock::{Scheme, MESSAGE_SIZE};

fn main() {
    // drand testnet unchained public key, and the signature it published for
    // round 1000. Any beacon client can fetch both.
    let pk_bytes = hex::decode("8200fc249deb0148eb918d6e213980c5d01acd7fc251900d9260136da3b54836ce125172399ddc69c4e3e11429b62c11").unwrap();
    let signature = hex::decode("a4721e6c3eafcd823f138cd29c6c82e8c5149101d0bb4bafddbac1c2d1fe3738895e4e21dd4b8b41bf007046440220910bb1cdb91f50a84a0d7f33ff2e8577aa62ac64b35a291a728a9db5ac91e06d1312b48a376138d77b4d6ad27c24221afe").unwrap();

    let msg = [8u8; MESSAGE_SIZE];
    let ct = tlock::time_lock(
        &mut rand::thread_rng(),
        Scheme::PedersenBlsUnchained,
        &pk_bytes,
        1000,
        msg,
    )
    .unwrap();

    let pt = tlock::time_unlock(&signature, &ct).unwrap();

    assert_eq!(msg.to_vec(), pt);
    println!("Encryption and decryption were successful");
}
