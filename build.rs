fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=proto/tour_solver.proto");

    // protoc is only required when the gRPC surface is compiled in
    if std::env::var_os("CARGO_FEATURE_SERVER").is_some() {
        tonic_build::compile_protos("proto/tour_solver.proto")?;
    }

    Ok(())
}
