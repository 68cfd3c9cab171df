use std::path::Path;

use protobuf::{Message, MessageField};

use crate::activation::activation::ActivationFunction;
use crate::error::Result;
use crate::math::matrix::Matrix;
use crate::network::network::Network;
use crate::onnx::protos::{
    attribute_proto::AttributeType, tensor_proto::DataType, tensor_shape_proto, type_proto,
    AttributeProto, GraphProto, ModelProto, NodeProto, OperatorSetIdProto, TensorProto,
    TensorShapeProto, TypeProto, ValueInfoProto,
};
use crate::onnx::{IR_VERSION, OPSET_VERSION};

pub const INPUT_NAME: &str = "input";
pub const OUTPUT_NAME: &str = "output";

/// Writes `network` as an ONNX model to `path`.
///
/// `example_input` is run through the network once; its shape becomes the
/// static input shape of the graph, and the observed output shape the static
/// output shape.
pub fn export_onnx(network: &Network, example_input: &Matrix, path: &Path) -> Result<()> {
    let model = build_model(network, example_input);
    let bytes = model.write_to_bytes()?;
    std::fs::write(path, bytes)?;

    log::info!(
        "exported onnx model ({} nodes, input [{}, {}]) to {}",
        model.graph.node.len(),
        example_input.rows,
        example_input.cols,
        path.display()
    );
    Ok(())
}

/// Builds the in-memory `ModelProto` for `network`.
///
/// Every dense layer `k` (1-based) becomes `Gemm(x, layer{k}.weight,
/// layer{k}.bias; transB=1)` followed by its activation. Weights are stored
/// as `[out, in]` float tensors in little-endian `raw_data`.
pub(crate) fn build_model(network: &Network, example_input: &Matrix) -> ModelProto {
    let traced = network.predict(example_input);

    let mut graph = GraphProto {
        name: "iris_classifier".into(),
        ..Default::default()
    };

    let mut current = INPUT_NAME.to_string();
    let last = network.layers.len().saturating_sub(1);
    for (i, layer) in network.layers.iter().enumerate() {
        let prefix = format!("layer{}", i + 1);
        let weight_name = format!("{prefix}.weight");
        let bias_name = format!("{prefix}.bias");

        graph.initializer.push(float_tensor(
            &weight_name,
            &[layer.size(), layer.input_size()],
            &layer.weights.transpose().to_f32_vec(),
        ));
        graph.initializer.push(float_tensor(
            &bias_name,
            &[layer.size()],
            &layer.biases.to_f32_vec(),
        ));

        let gemm_out = format!("/{prefix}/Gemm_output_0");
        graph.node.push(node(
            &format!("/{prefix}/Gemm"),
            "Gemm",
            vec![current, weight_name, bias_name],
            &gemm_out,
            vec![
                float_attr("alpha", 1.0),
                float_attr("beta", 1.0),
                int_attr("transB", 1),
            ],
        ));

        let op = layer.activator.onnx_op();
        let act_out = if i == last {
            OUTPUT_NAME.to_string()
        } else {
            format!("/{prefix}/{op}_output_0")
        };
        let attributes = match layer.activator {
            ActivationFunction::Softmax => vec![int_attr("axis", 1)],
            ActivationFunction::ReLU => vec![],
        };
        graph.node.push(node(
            &format!("/{prefix}/{op}"),
            op,
            vec![gemm_out],
            &act_out,
            attributes,
        ));

        current = act_out;
    }

    graph
        .input
        .push(value_info(INPUT_NAME, &[example_input.rows, example_input.cols]));
    graph
        .output
        .push(value_info(OUTPUT_NAME, &[traced.rows, traced.cols]));

    ModelProto {
        ir_version: IR_VERSION,
        opset_import: vec![OperatorSetIdProto {
            domain: String::new(),
            version: OPSET_VERSION,
            ..Default::default()
        }],
        producer_name: env!("CARGO_PKG_NAME").into(),
        producer_version: env!("CARGO_PKG_VERSION").into(),
        doc_string: "Iris species classifier: 4 features in, 3 class probabilities out.".into(),
        graph: MessageField::some(graph),
        ..Default::default()
    }
}

fn float_tensor(name: &str, dims: &[usize], values: &[f32]) -> TensorProto {
    TensorProto {
        name: name.into(),
        dims: dims.iter().map(|&d| d as i64).collect(),
        data_type: DataType::FLOAT as i32,
        raw_data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        ..Default::default()
    }
}

fn value_info(name: &str, dims: &[usize]) -> ValueInfoProto {
    let shape = TensorShapeProto {
        dim: dims
            .iter()
            .map(|&d| tensor_shape_proto::Dimension {
                value: Some(tensor_shape_proto::dimension::Value::DimValue(d as i64)),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };

    let tensor_type = type_proto::Tensor {
        elem_type: DataType::FLOAT as i32,
        shape: MessageField::some(shape),
        ..Default::default()
    };

    ValueInfoProto {
        name: name.into(),
        type_: MessageField::some(TypeProto {
            value: Some(type_proto::Value::TensorType(tensor_type)),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn node(
    name: &str,
    op_type: &str,
    inputs: Vec<String>,
    output: &str,
    attribute: Vec<AttributeProto>,
) -> NodeProto {
    NodeProto {
        name: name.into(),
        op_type: op_type.into(),
        input: inputs,
        output: vec![output.to_string()],
        attribute,
        ..Default::default()
    }
}

fn int_attr(name: &str, value: i64) -> AttributeProto {
    AttributeProto {
        name: name.into(),
        type_: AttributeType::INT.into(),
        i: value,
        ..Default::default()
    }
}

fn float_attr(name: &str, value: f32) -> AttributeProto {
    AttributeProto {
        name: name.into(),
        type_: AttributeType::FLOAT.into(),
        f: value,
        ..Default::default()
    }
}
