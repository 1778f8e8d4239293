use std::fs;
use std::process::ExitCode;

use tracing::info;

use tlock_age::armor::ArmoredWriter;
use tlock_age::chain::{self, ChainClient};
use tlock_age::TLockAgeError;

use crate::args::{Command, LockArgs, Options, UnlockArgs};

mod args;
mod http;

fn main() -> ExitCode {
    let opts = args::build();
    init_logging(&opts);

    let result = match opts.command {
        Some(Command::Lock(args)) => lock(args),
        Some(Command::Unlock(args)) => unlock(args),
        None => Ok(()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let mut source = std::error::Error::source(&e);
            while let Some(cause) = source {
                eprintln!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

fn lock(args: LockArgs) -> Result<(), TLockAgeError> {
    let client = http::HttpClient::new(&args.remote);
    let info = client.chain_info()?;

    let round_number = match args.round_number {
        Some(n) => n,
        None => {
            let d = args.duration.ok_or_else(|| {
                TLockAgeError::Protocol(
                    "either --round-number or --duration is required".to_string(),
                )
            })?;
            chain::round_after(&info, d.into())
        }
    };
    info!("locked until round {round_number}");

    let src = fs::File::open(&args.input_path)?;
    let mut encrypted = vec![];
    if args.armor {
        let mut writer = ArmoredWriter::wrap_output(&mut encrypted);
        tlock_age::encrypt(&mut writer, src, &info, round_number)?;
        writer.finish()?;
    } else {
        tlock_age::encrypt(&mut encrypted, src, &info, round_number)?;
    }
    fs::write(&args.output_path, encrypted)?;
    Ok(())
}

fn unlock(args: UnlockArgs) -> Result<(), TLockAgeError> {
    let client = http::HttpClient::new(&args.remote);

    let src = fs::File::open(&args.input_path)?;
    let mut decrypted = vec![];
    tlock_age::decrypt_with_client(&mut decrypted, src, &client)?;
    fs::write(&args.output_path, decrypted)?;
    Ok(())
}

// 0 success, 1 user error, 2 too early, 3 i/o or network, 4 crypto failure
fn exit_code(err: &TLockAgeError) -> u8 {
    match err {
        TLockAgeError::TooEarly { .. } => 2,
        TLockAgeError::Network(_) | TLockAgeError::Io(_) => 3,
        TLockAgeError::Authentication
        | TLockAgeError::InvalidCiphertext(_)
        | TLockAgeError::Internal(_) => 4,
        TLockAgeError::InputValidation(_)
        | TLockAgeError::Protocol(_)
        | TLockAgeError::UnsupportedScheme(_) => 1,
    }
}

fn init_logging(opts: &Options) {
    use tracing::level_filters::LevelFilter;

    let level = match opts.verbose.log_level_filter() {
        log::LevelFilter::Off => LevelFilter::OFF,
        log::LevelFilter::Error => LevelFilter::ERROR,
        log::LevelFilter::Warn => LevelFilter::WARN,
        log::LevelFilter::Info => LevelFilter::INFO,
        log::LevelFilter::Debug => LevelFilter::DEBUG,
        log::LevelFilter::Trace => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code(&TLockAgeError::TooEarly {
                round: 10,
                unlock_at: 300
            }),
            2
        );
        assert_eq!(exit_code(&TLockAgeError::Authentication), 4);
        assert_eq!(exit_code(&TLockAgeError::Protocol("x".to_string())), 1);
        assert_eq!(
            exit_code(&TLockAgeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "missing"
            ))),
            3
        );
    }
}
