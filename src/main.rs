//! radar_love CLI binary
//!
//! Minimal entrypoint: all logic is in the library; main.rs only maps
//! cli::run()'s exit code to a process exit.

fn main() {
    // cli::run() handles ALL output including errors.
    if let Err(code) = radar_love::cli::run() {
        std::process::exit(code.as_i32());
    }
}
