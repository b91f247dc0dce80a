fn main() {
    // Only the linked engine needs a search path; the stub builds anywhere.
    if std::env::var_os("CARGO_FEATURE_NATIVE").is_some() {
        if let Some(dir) = std::env::var_os("OPENPANO_LIB_DIR") {
            println!(
                "cargo:rustc-link-search=native={}",
                std::path::Path::new(&dir).display()
            );
        }
    }

    println!("cargo:rerun-if-env-changed=OPENPANO_LIB_DIR");
    println!("cargo:rerun-if-changed=build.rs");
}
