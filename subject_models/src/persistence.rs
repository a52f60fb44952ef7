use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};
use machine_learning::{MlErr, arch::layers::Layer};
use safetensors::{Dtype, SafeTensors, tensor::TensorView};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    Result, SubjectErr,
    functions::FnName,
    net::{SubjectNet, subject_architecture, subject_net_from_params},
};

/// The description of a trained subject network, stored next to its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    pub fn_name: FnName,
    pub parameter: f64,
    pub loss: f64,
    pub seed: u64,
    pub weight_decay: f64,
    pub epochs: usize,
}

/// The location of a subject network's parameter file.
pub fn model_path(base: &Path, id: &Uuid) -> PathBuf {
    base.join(format!("{id}.pickle"))
}

/// The location of a subject network's metadata file.
pub fn metadata_path(base: &Path, id: &Uuid) -> PathBuf {
    base.join(format!("{id}_metadata.json"))
}

/// A directory of trained subject networks, each stored as a parameter file and a metadata file
/// sharing a random identifier.
pub struct ArtifactStore {
    base: PathBuf,
}

impl ArtifactStore {
    /// Opens the store at `base`, creating the directory if needed.
    pub fn open<P: Into<PathBuf>>(base: P) -> Result<Self> {
        let base = base.into();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Persists a network and its metadata under a fresh identifier.
    ///
    /// Each file is written to a temporary sibling and renamed into place, but the pair is not
    /// written atomically: a failure after the parameters are saved leaves them without
    /// metadata.
    ///
    /// # Returns
    /// The identifier both files are named after.
    pub fn save(&self, net: &SubjectNet, metadata: &RunMetadata) -> Result<Uuid> {
        let id = Uuid::new_v4();

        let model_path = model_path(&self.base, &id);
        write_atomic(&model_path, &serialize_params(net)?)?;

        let metadata_path = metadata_path(&self.base, &id);
        write_atomic(&metadata_path, &serde_json::to_vec(metadata)?)?;

        info!(
            "saved subject network to {} and {}",
            model_path.display(),
            metadata_path.display()
        );
        debug!(loss = metadata.loss; "saved metadata of {id}");
        Ok(id)
    }

    /// Reads a persisted network and its metadata back.
    pub fn load(&self, id: &Uuid) -> Result<(SubjectNet, RunMetadata)> {
        let bytes = fs::read(model_path(&self.base, id))?;
        let net = deserialize_params(&bytes)?;

        let metadata = fs::read(metadata_path(&self.base, id))?;
        let metadata = serde_json::from_slice(&metadata)?;

        Ok((net, metadata))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// A named tensor of the state of a network: `(name, shape, values)`.
type NamedTensor = (String, Vec<usize>, Vec<f32>);

/// Splits the flat parameters of a network into named tensors.
///
/// Tensors are named after the position of their layer in a sequential container where each
/// activation counts as a module of its own (`0.weight`, `0.bias`, `2.weight`, ...). Weights are
/// stored as `(out, in)`.
fn state_dict(net: &SubjectNet) -> Vec<NamedTensor> {
    let mut offset = 0;
    let mut tensors: Vec<NamedTensor> = Vec::new();

    for (i, layer) in net.model().layers().iter().enumerate() {
        let Layer::Dense(dense) = layer;
        let (n_in, n_out) = dense.dim();
        let params = &net.params()[offset..offset + dense.size()];
        let (w, b) = params.split_at(n_in * n_out);

        let w_t: Vec<f32> = (0..n_out)
            .flat_map(|o| (0..n_in).map(move |i| w[i * n_out + o]))
            .collect();

        tensors.push((format!("{}.weight", 2 * i), vec![n_out, n_in], w_t));
        tensors.push((format!("{}.bias", 2 * i), vec![n_out], b.to_vec()));
        offset += dense.size();
    }

    tensors
}

fn serialize_params(net: &SubjectNet) -> Result<Vec<u8>> {
    let tensors = state_dict(net);

    let views = tensors
        .iter()
        .map(|(name, shape, values)| tensor_view(name, shape, values))
        .collect::<Result<Vec<_>>>()?;

    Ok(safetensors::serialize(views, &None::<HashMap<String, String>>)?)
}

fn tensor_view<'a>(
    name: &'a str,
    shape: &[usize],
    values: &'a [f32],
) -> Result<(&'a str, TensorView<'a>)> {
    let view = TensorView::new(Dtype::F32, shape.to_vec(), bytemuck::cast_slice(values))?;
    Ok((name, view))
}

fn deserialize_params(bytes: &[u8]) -> Result<SubjectNet> {
    let tensors = SafeTensors::deserialize(bytes)?;
    let architecture = subject_architecture();
    let mut params = Vec::new();

    for (i, layer) in architecture.layers().iter().enumerate() {
        let Layer::Dense(dense) = layer;
        let (n_in, n_out) = dense.dim();

        let w_t = read_f32(&tensors, &format!("{}.weight", 2 * i), n_in * n_out)?;
        let b = read_f32(&tensors, &format!("{}.bias", 2 * i), n_out)?;

        let w_t = &w_t;
        params.extend((0..n_in).flat_map(|i| (0..n_out).map(move |o| w_t[o * n_in + i])));
        params.extend(b);
    }

    subject_net_from_params(params)
}

fn read_f32(tensors: &SafeTensors<'_>, name: &str, expected: usize) -> Result<Vec<f32>> {
    let view = tensors.tensor(name)?;
    if view.dtype() != Dtype::F32 {
        return Err(SubjectErr::Dtype {
            name: name.to_string(),
            got: view.dtype(),
        });
    }

    let values: Vec<f32> = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    if values.len() != expected {
        return Err(MlErr::SizeMismatch {
            what: "stored tensor",
            got: values.len(),
            expected,
        }
        .into());
    }

    Ok(values)
}
