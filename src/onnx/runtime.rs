use std::collections::HashMap;
use std::path::Path;

use protobuf::Message;

use crate::error::{Error, Result};
use crate::onnx::protos::{
    tensor_proto::DataType, tensor_shape_proto, type_proto, GraphProto, ModelProto, NodeProto,
    TensorProto, ValueInfoProto,
};

/// Dense `f32` tensor of rank 1 or 2, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub dims: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(dims: Vec<usize>, data: Vec<f32>) -> Result<Tensor> {
        let expected: usize = dims.iter().product();
        if expected != data.len() {
            return Err(Error::ShapeMismatch {
                expected: dims,
                actual: vec![data.len()],
            });
        }
        Ok(Tensor { dims, data })
    }

    /// Rows and columns, viewing a vector as a single row.
    fn matrix_shape(&self) -> Result<(usize, usize)> {
        match self.dims.as_slice() {
            [n] => Ok((1, *n)),
            [m, n] => Ok((*m, *n)),
            dims => Err(Error::UnsupportedModel(format!(
                "only rank 1 and 2 tensors are supported, got {dims:?}"
            ))),
        }
    }

    fn at(&self, cols: usize, row: usize, col: usize) -> f32 {
        self.data[row * cols + col]
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Gemm {
        alpha: f32,
        beta: f32,
        trans_a: bool,
        trans_b: bool,
    },
    MatMul,
    Add,
    Relu,
    Softmax {
        axis: i64,
    },
    Identity,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    op: Op,
    inputs: Vec<String>,
    output: String,
}

/// A loaded ONNX graph that can be executed on `f32` inputs.
///
/// Supports the operators dense classifiers are exported with: `Gemm`,
/// `MatMul`, `Add`, `Relu`, `Softmax` and `Identity` on tensors of rank ≤ 2.
#[derive(Debug, Clone)]
pub struct InferenceSession {
    nodes: Vec<Node>,
    initializers: HashMap<String, Tensor>,
    input_name: String,
    input_dims: Vec<Option<usize>>,
    output_name: String,
}

impl InferenceSession {
    pub fn load(path: &Path) -> Result<Self> {
        log::info!("loading onnx model from {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let model = ModelProto::parse_from_bytes(bytes)?;
        Self::from_model(&model)
    }

    fn from_model(model: &ModelProto) -> Result<Self> {
        let opset = model
            .opset_import
            .iter()
            .find(|o| o.domain.is_empty() || o.domain == "ai.onnx")
            .map(|o| o.version)
            .ok_or_else(|| Error::UnsupportedModel("no default-domain opset".into()))?;

        let graph: &GraphProto = model
            .graph
            .as_ref()
            .ok_or_else(|| Error::UnsupportedModel("model has no graph".into()))?;

        let initializers = graph
            .initializer
            .iter()
            .map(|t| Ok((t.name.clone(), decode_initializer(t)?)))
            .collect::<Result<HashMap<_, _>>>()?;

        let input = graph
            .input
            .iter()
            .find(|vi| !initializers.contains_key(&vi.name))
            .ok_or_else(|| Error::UnsupportedModel("graph has no runtime input".into()))?;
        let output = graph
            .output
            .first()
            .ok_or_else(|| Error::UnsupportedModel("graph has no output".into()))?;

        let nodes = graph
            .node
            .iter()
            .map(|n| parse_node(n, opset))
            .collect::<Result<Vec<_>>>()?;

        log::debug!(
            "onnx graph '{}': opset {}, {} nodes, {} initializers",
            graph.name,
            opset,
            nodes.len(),
            initializers.len()
        );

        Ok(InferenceSession {
            nodes,
            initializers,
            input_name: input.name.clone(),
            input_dims: declared_dims(input)?,
            output_name: output.name.clone(),
        })
    }

    /// Declared input shape; `None` marks a symbolic dimension.
    pub fn input_dims(&self) -> &[Option<usize>] {
        &self.input_dims
    }

    /// Static batch size of the input, if the first dimension is fixed.
    pub fn batch_size(&self) -> Option<usize> {
        self.input_dims.first().copied().flatten()
    }

    /// Executes the graph on `input` and returns the graph output.
    pub fn run(&self, input: Tensor) -> Result<Tensor> {
        let matches = input.dims.len() == self.input_dims.len()
            && input
                .dims
                .iter()
                .zip(&self.input_dims)
                .all(|(actual, declared)| declared.map_or(true, |d| d == *actual));
        if !matches {
            return Err(Error::ShapeMismatch {
                expected: self.input_dims.iter().map(|d| d.unwrap_or(0)).collect(),
                actual: input.dims,
            });
        }

        let mut values: HashMap<&str, Tensor> = HashMap::new();
        values.insert(self.input_name.as_str(), input);

        for node in &self.nodes {
            let args = node
                .inputs
                .iter()
                .filter(|name| !name.is_empty())
                .map(|name| {
                    values
                        .get(name.as_str())
                        .or_else(|| self.initializers.get(name))
                        .ok_or_else(|| {
                            Error::UnsupportedModel(format!(
                                "node '{}' reads undefined value '{}'",
                                node.name, name
                            ))
                        })
                })
                .collect::<Result<Vec<&Tensor>>>()?;

            let out = execute(&node.op, &args)?;
            values.insert(node.output.as_str(), out);
        }

        values.remove(self.output_name.as_str()).ok_or_else(|| {
            Error::UnsupportedModel(format!("output '{}' was never produced", self.output_name))
        })
    }
}

// ---------------------------------------------------------------------------
// Graph decoding
// ---------------------------------------------------------------------------

fn decode_initializer(tensor: &TensorProto) -> Result<Tensor> {
    if tensor.data_type != DataType::FLOAT as i32 {
        return Err(Error::UnsupportedModel(format!(
            "initializer '{}' has data type {}, only float is supported",
            tensor.name, tensor.data_type
        )));
    }

    let dims = tensor
        .dims
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::UnsupportedModel(format!("negative dim in '{}'", tensor.name)))?;

    let data = if tensor.raw_data.is_empty() {
        tensor.float_data.clone()
    } else {
        if tensor.raw_data.len() % 4 != 0 {
            return Err(Error::UnsupportedModel(format!(
                "raw data of '{}' is not a whole number of floats",
                tensor.name
            )));
        }
        tensor
            .raw_data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    };

    Tensor::new(dims, data)
}

fn declared_dims(value: &ValueInfoProto) -> Result<Vec<Option<usize>>> {
    let tensor_type = match &value.type_.value {
        Some(type_proto::Value::TensorType(t)) => t,
        _ => {
            return Err(Error::UnsupportedModel(format!(
                "input '{}' is not a tensor",
                value.name
            )))
        }
    };
    if tensor_type.elem_type != DataType::FLOAT as i32 {
        return Err(Error::UnsupportedModel(format!(
            "input '{}' is not a float tensor",
            value.name
        )));
    }

    Ok(tensor_type
        .shape
        .dim
        .iter()
        .map(|d| match d.value {
            Some(tensor_shape_proto::dimension::Value::DimValue(v)) if v > 0 => Some(v as usize),
            _ => None,
        })
        .collect())
}

fn parse_node(node: &NodeProto, opset: i64) -> Result<Node> {
    let int = |name: &str, default: i64| {
        node.attribute
            .iter()
            .find(|a| a.name == name)
            .map_or(default, |a| a.i)
    };
    let float = |name: &str, default: f32| {
        node.attribute
            .iter()
            .find(|a| a.name == name)
            .map_or(default, |a| a.f)
    };

    let op = match node.op_type.as_str() {
        "Gemm" => Op::Gemm {
            alpha: float("alpha", 1.0),
            beta: float("beta", 1.0),
            trans_a: int("transA", 0) != 0,
            trans_b: int("transB", 0) != 0,
        },
        "MatMul" => Op::MatMul,
        "Add" => Op::Add,
        "Relu" => Op::Relu,
        // The default axis moved from 1 to -1 in opset 13.
        "Softmax" => Op::Softmax {
            axis: int("axis", if opset >= 13 { -1 } else { 1 }),
        },
        "Identity" => Op::Identity,
        other => {
            return Err(Error::UnsupportedModel(format!(
                "operator '{other}' (node '{}')",
                node.name
            )))
        }
    };

    let output = node.output.first().cloned().ok_or_else(|| {
        Error::UnsupportedModel(format!("node '{}' has no output", node.name))
    })?;

    Ok(Node {
        name: node.name.clone(),
        op,
        inputs: node.input.clone(),
        output,
    })
}

// ---------------------------------------------------------------------------
// Kernels
// ---------------------------------------------------------------------------

fn execute(op: &Op, args: &[&Tensor]) -> Result<Tensor> {
    let arity = match op {
        Op::Gemm { .. } => 2..=3,
        Op::MatMul | Op::Add => 2..=2,
        Op::Relu | Op::Softmax { .. } | Op::Identity => 1..=1,
    };
    if !arity.contains(&args.len()) {
        return Err(Error::UnsupportedModel(format!(
            "{op:?} called with {} inputs",
            args.len()
        )));
    }

    match *op {
        Op::Gemm {
            alpha,
            beta,
            trans_a,
            trans_b,
        } => {
            let product = matmul(args[0], trans_a, args[1], trans_b)?;
            let scaled = Tensor {
                data: product.data.iter().map(|x| alpha * x).collect(),
                ..product
            };
            match args.get(2) {
                Some(c) => broadcast_add(&scaled, c, beta),
                None => Ok(scaled),
            }
        }
        Op::MatMul => matmul(args[0], false, args[1], false),
        Op::Add => broadcast_add(args[0], args[1], 1.0),
        Op::Relu => Ok(Tensor {
            dims: args[0].dims.clone(),
            data: args[0].data.iter().map(|&x| if x < 0.0 { 0.0 } else { x }).collect(),
        }),
        Op::Softmax { axis } => softmax(args[0], axis),
        Op::Identity => Ok(args[0].clone()),
    }
}

fn matmul(a: &Tensor, trans_a: bool, b: &Tensor, trans_b: bool) -> Result<Tensor> {
    let (a_rows, a_cols) = a.matrix_shape()?;
    let (b_rows, b_cols) = b.matrix_shape()?;
    let (m, k) = if trans_a { (a_cols, a_rows) } else { (a_rows, a_cols) };
    let (k2, n) = if trans_b { (b_cols, b_rows) } else { (b_rows, b_cols) };
    if k != k2 {
        return Err(Error::ShapeMismatch {
            expected: vec![m, k],
            actual: vec![k2, n],
        });
    }

    let a_at = |i: usize, p: usize| if trans_a { a.at(a_cols, p, i) } else { a.at(a_cols, i, p) };
    let b_at = |p: usize, j: usize| if trans_b { b.at(b_cols, j, p) } else { b.at(b_cols, p, j) };

    let mut data = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            data[i * n + j] = (0..k).map(|p| a_at(i, p) * b_at(p, j)).sum();
        }
    }
    Ok(Tensor {
        dims: vec![m, n],
        data,
    })
}

/// `a + beta * c`, with `c` broadcast from a scalar, a row or a full matrix.
fn broadcast_add(a: &Tensor, c: &Tensor, beta: f32) -> Result<Tensor> {
    let (m, n) = a.matrix_shape()?;
    let (c_rows, c_cols) = c.matrix_shape()?;

    let scalar = c_rows == 1 && c_cols == 1;
    let row = c_rows == 1 && c_cols == n;
    if !(scalar || row || (c_rows == m && c_cols == n)) {
        return Err(Error::ShapeMismatch {
            expected: vec![m, n],
            actual: c.dims.clone(),
        });
    }

    let mut data = a.data.clone();
    for i in 0..m {
        for j in 0..n {
            let c_ij = if scalar {
                c.data[0]
            } else if row {
                c.data[j]
            } else {
                c.data[i * n + j]
            };
            data[i * n + j] += beta * c_ij;
        }
    }
    Ok(Tensor {
        dims: a.dims.clone(),
        data,
    })
}

fn softmax(x: &Tensor, axis: i64) -> Result<Tensor> {
    let rank = x.dims.len() as i64;
    let axis = if axis < 0 { axis + rank } else { axis };
    if axis != rank - 1 {
        return Err(Error::UnsupportedModel(format!(
            "softmax over axis {axis} of a rank {rank} tensor"
        )));
    }

    let cols = *x.dims.last().unwrap_or(&1);
    let mut data = x.data.clone();
    for row in data.chunks_mut(cols.max(1)) {
        let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for v in row.iter_mut() {
            *v = (*v - max).exp();
            sum += *v;
        }
        for v in row.iter_mut() {
            *v /= sum;
        }
    }
    Ok(Tensor {
        dims: x.dims.clone(),
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;
    use crate::network::network::Network;
    use crate::onnx::export::build_model;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn exported_session(network: &Network, example: &Matrix) -> InferenceSession {
        let bytes = build_model(network, example).write_to_bytes().unwrap();
        InferenceSession::from_bytes(&bytes).unwrap()
    }

    #[test]
    fn reproduces_network_predictions() {
        let mut rng = StdRng::seed_from_u64(21);
        let network = Network::iris_classifier(&mut rng);
        let example = Matrix::uniform(30, 4, 2.0, &mut rng);
        let session = exported_session(&network, &example);

        let out = session
            .run(Tensor::new(vec![30, 4], example.to_f32_vec()).unwrap())
            .unwrap();
        let expected = network.predict(&example);

        assert_eq!(out.dims, vec![30, 3]);
        for (o, e) in out.data.iter().zip(expected.as_slice()) {
            assert!((*o as f64 - e).abs() < 1e-4, "{o} vs {e}");
        }
        assert_eq!(session.batch_size(), Some(30));
        assert_eq!(session.input_dims(), &[Some(30), Some(4)]);
    }

    #[test]
    fn rejects_inputs_of_the_wrong_shape() {
        let mut rng = StdRng::seed_from_u64(21);
        let network = Network::iris_classifier(&mut rng);
        let session = exported_session(&network, &Matrix::zeros(30, 4));

        let err = session
            .run(Tensor::new(vec![10, 4], vec![0.0; 40]).unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn gemm_honours_transpose_and_scaling() {
        let a = Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = Tensor::new(vec![2, 2], vec![1.0, 0.0, 1.0, 1.0]).unwrap();
        let c = Tensor::new(vec![2], vec![10.0, 20.0]).unwrap();
        let op = Op::Gemm {
            alpha: 2.0,
            beta: 0.5,
            trans_a: false,
            trans_b: true,
        };

        // a · bᵀ = [[1, 3], [3, 7]]
        let out = execute(&op, &[&a, &b, &c]).unwrap();
        assert_eq!(out.data, vec![7.0, 16.0, 11.0, 24.0]);
    }

    #[test]
    fn unknown_operators_are_rejected() {
        let node = NodeProto {
            op_type: "Conv".into(),
            output: vec!["y".into()],
            ..Default::default()
        };
        assert!(matches!(
            parse_node(&node, 13),
            Err(Error::UnsupportedModel(_))
        ));
    }

    #[test]
    fn softmax_default_axis_depends_on_opset() {
        let node = NodeProto {
            op_type: "Softmax".into(),
            output: vec!["y".into()],
            ..Default::default()
        };
        assert_eq!(parse_node(&node, 13).unwrap().op, Op::Softmax { axis: -1 });
        assert_eq!(parse_node(&node, 11).unwrap().op, Op::Softmax { axis: 1 });
    }
}
