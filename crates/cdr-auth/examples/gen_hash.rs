//! Password hash generator
//!
//! Usage: cargo run --example gen_hash -p cdr-auth -- <username> <password> [role]
//!
//! Prints an INSERT statement for the `users` table.

use cdr_auth::PasswordService;
use cdr_core::models::UserRole;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let username = args.next().unwrap_or_else(|| "admin".to_string());
    let password = args.next().ok_or("missing password argument")?;
    let role = match args.next() {
        Some(raw) => UserRole::parse(&raw).ok_or("role must be 'operator' or 'admin'")?,
        None => UserRole::Admin,
    };

    let hash = PasswordService::new().hash_password(&password)?;

    println!("INSERT INTO users (username, password_hash, role)");
    println!("VALUES ('{}', '{}', '{}');", username.replace('\'', "''"), hash, role);
    Ok(())
}
