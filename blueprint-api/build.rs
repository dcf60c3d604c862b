//! Build script for the blueprint API
//!
//! Compiles the Protocol Buffer definitions into Rust code using
//! tonic-prost-build. Well-known types map onto prost-types.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        // Server for the façade, client for integration tests
        .build_server(true)
        .build_client(true)
        .compile_protos(&["proto/blueprint.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/blueprint.proto");

    Ok(())
}
