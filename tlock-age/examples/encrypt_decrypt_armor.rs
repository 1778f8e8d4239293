use group::Curve;
use std::ops::Mul;

use tlock_age::chain::ChainInfo;

// A stand-in beacon keypair so the example runs without touching the
// network: the chain's master key, and the signature it would publish for
// round 1000. Against a real network both come from a beacon client.
fn stand_in_beacon(round: u64) -> (ChainInfo, Vec<u8>) {
    let s = bls12_381_plus::Scalar::from_raw([7, 7, 7, 7]);
    let pk = bls12_381_plus::G1Affine::generator()
        .mul(s)
        .to_affine()
        .to_compressed();
    let info = ChainInfo::new("pedersen-bls-unchained", 30, 1_595_431_050, &[0x42; 32], &pk);
    let signature = tlock::identity_point(tlock::Scheme::PedersenBlsUnchained, round)
        .mul(s)
        .to_compressed();
    (info, signature)
}

fn main() {
    let msg = b"Hello world! I'm encrypting a message using timelock encryption.".to_vec();
    let round = 1000;
    let (info, signature) = stand_in_beacon(round);

    // Encryption with armoring, making the encrypted message ASCII printable
    let mut armored = tlock_age::armor::ArmoredWriter::wrap_output(vec![]);
    tlock_age::encrypt(&mut armored, msg.as_slice(), &info, round).unwrap();
    let encrypted = armored.finish().unwrap();
    println!("{}", String::from_utf8(encrypted.clone()).unwrap());

    // Decrypting the message requires the round signature, here computed
    // locally from the stand-in master key.
    let mut decrypted = vec![];
    tlock_age::decrypt(
        &mut decrypted,
        encrypted.as_slice(),
        &info.hash(),
        &signature,
    )
    .unwrap();
    let decrypted = std::str::from_utf8(&decrypted).unwrap();

    println!("{decrypted}");
}
