//! Build script for prism-core
//!
//! Checks the toolchain before compilation.
//!
//! ## Requirements
//!
//! - **Rust**: 1.70.0 or newer (`Option::is_some_and`, `OnceCell` patterns)
//! - **Linux**: live process reads use `process_vm_readv` (kernel 3.2+)

fn main()
{
    if let Ok(rustc_version) = rustc_version::version() {
        let min_rust_version = rustc_version::Version::new(1, 70, 0);

        if rustc_version < min_rust_version {
            panic!("prism-core requires Rust {min_rust_version} or newer, found {rustc_version}");
        }
    } else {
        // If we can't get version (e.g., in some build environments), just warn
        println!("cargo:warning=could not verify Rust version");
    }
}
