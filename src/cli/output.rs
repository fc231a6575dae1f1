//! Plain-text CLI output helpers, in the reference's `cli::output` shape
//! (section/field/success/warning) without pulling in a terminal-colour crate.

use std::fmt::Display;

pub fn section(title: &str) {
    println!();
    println!("{title}");
}

pub fn field(label: &str, value: impl Display) {
    println!("  {label:<14} {value}");
}

pub fn success(message: &str) {
    println!("  [ok] {message}");
}

pub fn warning(message: &str) {
    println!("  [warn] {message}");
}

pub fn error(message: &str) {
    eprintln!("  [error] {message}");
}
