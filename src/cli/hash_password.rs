//! Hash-password command

use clap::Args;

use crate::domain::user::validate_password;
use crate::domain::PasswordHasher;
use crate::infrastructure::auth::Argon2Hasher;

#[derive(Debug, Args)]
pub struct HashPasswordArgs {
    /// Password to hash
    pub password: String,

    /// Hash even if the password fails the password policy
    #[arg(long)]
    pub skip_policy: bool,
}

pub fn run(args: HashPasswordArgs) -> anyhow::Result<()> {
    if !args.skip_policy {
        validate_password(&args.password)?;
    }

    let hash = Argon2Hasher::new().hash(&args.password)?;
    println!("{}", hash);
    Ok(())
}
