fn main() {
    println!("cargo:rustc-check-cfg=cfg(embedded_installer)");

    // Embed the Npcap installer when it has been placed in resources/ before the build.
    // Without it the binary falls back to reading the installer from disk at runtime.
    let installer = std::path::Path::new("resources/npcap-installer.exe");
    if installer.exists() {
        println!("cargo:rustc-cfg=embedded_installer");
        println!(
            "cargo:warning=Embedding Npcap installer from {}",
            installer.display()
        );
    }

    println!("cargo:rerun-if-changed=resources/npcap-installer.exe");
}
