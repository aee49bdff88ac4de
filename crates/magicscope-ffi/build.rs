fn main() {
    // Allow pointing at a non-system libmagic, e.g. a Homebrew prefix.
    if let Ok(dir) = std::env::var("MAGIC_LIB_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }
    println!("cargo:rustc-link-lib=magic");
    println!("cargo:rerun-if-env-changed=MAGIC_LIB_DIR");
    println!("cargo:rerun-if-changed=build.rs");
}
