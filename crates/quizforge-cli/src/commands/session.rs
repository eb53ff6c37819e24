//! The `quizforge login` and `quizforge logout` commands.
//!
//! Identity is local only: logging in records a name and email so attempts
//! are kept under a per-student file instead of the guest one.

use std::path::PathBuf;

use anyhow::Result;

use super::open_store;

pub fn login(name: &str, email: &str, config: Option<PathBuf>) -> Result<()> {
    anyhow::ensure!(!name.trim().is_empty(), "name must not be empty");
    anyhow::ensure!(email.contains('@'), "invalid email address: '{email}'");

    let store = open_store(config.as_deref())?;
    let student = store.login(name, email)?;
    println!("Logged in as {} <{}> (id {})", student.name, student.email, student.id);
    Ok(())
}

pub fn logout(config: Option<PathBuf>) -> Result<()> {
    let store = open_store(config.as_deref())?;
    if store.logout()? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}
