fn main() {
    // Stamped into `penplot --version` output
    let build_date = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    println!("cargo:rustc-env=PENPLOT_BUILD_DATE={}", build_date);
    println!("cargo:rerun-if-changed=build.rs");
}
