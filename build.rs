fn main() {
    println!("cargo:rerun-if-changed=proto/webcast.proto");
    prost_build::compile_protos(&["proto/webcast.proto"], &["proto/"])
        .expect("failed to compile webcast.proto");
}
