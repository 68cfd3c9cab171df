fn main() {
    // Generate the onnx protobuf types used by the exporter and the runtime.
    protobuf_codegen::Codegen::new()
        .pure()
        .includes(["src/onnx/protos"])
        .input("src/onnx/protos/onnx.proto")
        .cargo_out_dir("onnx-protos")
        .run_from_script();
}
