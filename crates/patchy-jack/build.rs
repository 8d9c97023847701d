//! Build script for patchy-jack.
//!
//! Checks that libjack is available.

fn main() {
    // The jack crate loads libjack at runtime, so a missing library only warns
    if let Err(e) = pkg_config::probe_library("jack") {
        println!("cargo:warning=libjack not found: {e}");
        println!("cargo:warning=Install jack2-devel (Fedora) or libjack-jackd2-dev (Debian/Ubuntu)");
    }
}
