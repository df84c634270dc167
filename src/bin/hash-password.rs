//! Prints the client-side password digest `SHA1(email:password)` that the
//! register and authenticate endpoints expect in `passwd`.

use awesome_blog::session::sha1_hex;
use std::env;

fn main() {
    let mut args = env::args().skip(1);
    let (Some(email), Some(password)) = (args.next(), args.next()) else {
        eprintln!("Usage: cargo run --bin hash-password <EMAIL> <PASSWORD>");
        std::process::exit(1);
    };

    let email = email.trim().to_lowercase();
    let digest = sha1_hex(&format!("{}:{}", email, password));

    println!("\nEmail    : {}", email);
    println!("Digest   : {}\n", digest);
    println!("# Send this as the \"passwd\" field:");
    println!("{{\"email\": \"{}\", \"passwd\": \"{}\"}}", email, digest);
}
