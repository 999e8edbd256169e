fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::var("OUT_DIR")?;

    println!("cargo:rerun-if-changed=proto/greeter.proto");

    tonic_prost_build::configure()
        .file_descriptor_set_path(format!("{}/greeter_descriptor.bin", out_dir))
        .type_attribute(".greet", "#[derive(serde::Serialize)]")
        .compile_protos(&["proto/greeter.proto"], &["proto"])?;

    Ok(())
}
