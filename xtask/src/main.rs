use anyhow::{anyhow, bail, Context, Result};
use ndarray::Array2;
use scatter_rs::kernel::KernelLifecycle;
use scatter_rs::scattering1d::{
    JtfsConfig, OutType, PathFamily, Scatter1D, ScatteringOutput, TimeFrequencyScattering1D,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_SHAPE: usize = 512;
const BATCH: usize = 2;
const TIMING_ITERS: usize = 5;

#[derive(Debug, Serialize, Deserialize, Clone)]
struct ShapeRow {
    case_id: String,
    shape: usize,
    out_type: String,
    out_3d: bool,
    average_fr: bool,
    path_count: usize,
    families: Vec<String>,
    tensors: BTreeMap<String, Vec<usize>>,
    avg_ns: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct ShapeBundle {
    generated_epoch_seconds: u64,
    batch: usize,
    n_frs: Vec<usize>,
    j_pad: u32,
    rows: Vec<ShapeRow>,
}

#[derive(Debug, Serialize, Deserialize)]
struct MetaRow {
    family: String,
    n1: Option<usize>,
    n2: Option<usize>,
    n1_fr: Option<usize>,
    row: Option<usize>,
    stride_t: u32,
    stride_fr: Option<u32>,
    shape: Vec<usize>,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("shapes") => run_shapes(parse_shape(args.next())?),
        Some("meta") => run_meta(parse_shape(args.next())?),
        _ => {
            eprintln!("Usage:");
            eprintln!("  cargo run -p xtask -- shapes [N]");
            eprintln!("  cargo run -p xtask -- meta [N]");
            Ok(())
        }
    }
}

fn parse_shape(arg: Option<String>) -> Result<usize> {
    match arg {
        None => Ok(DEFAULT_SHAPE),
        Some(s) => s
            .parse()
            .with_context(|| format!("signal length `{s}` is not a positive integer")),
    }
}

fn output_dir() -> Result<PathBuf> {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let out_dir = PathBuf::from(format!("target/contracts/{ts}"));
    fs::create_dir_all(&out_dir).context("creating contract output directory")?;
    Ok(out_dir)
}

fn synthetic_batch(n: usize) -> Array2<f64> {
    Array2::from_shape_fn((BATCH, n), |(b, i)| {
        let x = i as f64 / 27.0;
        let sweep = (b + 1) as f64 * 0.002 * i as f64;
        x.sin() + 0.35 * (2.3 * x).cos() + 0.1 * (sweep * x).sin()
    })
}

fn run_shapes(n: usize) -> Result<()> {
    let out_dir = output_dir()?;
    let batch = synthetic_batch(n);
    let mut rows = Vec::new();
    let mut reference = None;

    for average_fr in [false, true] {
        for out_3d in [false, true] {
            if out_3d && !average_fr {
                continue;
            }
            for out_type in OutType::ALL {
                let case_id = format!(
                    "n{n}_{}_{}{}",
                    out_type.label().replace(':', "_"),
                    if out_3d { "3d" } else { "flat" },
                    if average_fr { "_avgfr" } else { "" }
                );
                let jtfs = TimeFrequencyScattering1D::try_new(JtfsConfig {
                    average_fr,
                    out_3d,
                    out_type,
                    ..JtfsConfig::new(n)
                })
                .map_err(|e| anyhow!("case {case_id} failed to configure: {e}"))?;
                if reference.is_none() {
                    reference = Some((jtfs.n_frs().to_vec(), jtfs.j_pad()));
                }

                let first = jtfs
                    .run_batch(&batch)
                    .map_err(|e| anyhow!("case {case_id} failed: {e}"))?;
                let second = jtfs
                    .run_batch(&batch)
                    .map_err(|e| anyhow!("case {case_id} failed on rerun: {e}"))?;
                ensure_same_output(&case_id, &first, &second)?;

                let avg_ns = benchmark_avg_ns(TIMING_ITERS, || {
                    jtfs.run_batch(&batch)
                        .map(|_| ())
                        .map_err(|e| anyhow!("case {case_id} benchmark failed: {e}"))
                })?;
                let row = ShapeRow {
                    case_id: case_id.clone(),
                    shape: n,
                    out_type: out_type.label().to_string(),
                    out_3d,
                    average_fr,
                    path_count: first.path_count(),
                    families: first
                        .families()
                        .unwrap_or_default()
                        .iter()
                        .map(|f| f.label().to_string())
                        .collect(),
                    tensors: tensor_shapes(&first),
                    avg_ns,
                };
                info!(
                    case = %row.case_id,
                    paths = row.path_count,
                    avg_ms = avg_ns / 1e6,
                    "shape case"
                );
                rows.push(row);
            }
        }
    }

    let (n_frs, j_pad) = reference.ok_or_else(|| anyhow!("no shape cases were run"))?;
    let bundle = ShapeBundle {
        generated_epoch_seconds: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        batch: BATCH,
        n_frs,
        j_pad,
        rows,
    };
    let json_path = out_dir.join("shapes.json");
    fs::write(&json_path, serde_json::to_string_pretty(&bundle)?)
        .with_context(|| format!("writing {}", json_path.display()))?;
    let csv_path = out_dir.join("shapes.csv");
    write_summary_csv(&csv_path, &bundle.rows)?;
    info!(dir = %out_dir.display(), "wrote shape table");
    Ok(())
}

fn run_meta(n: usize) -> Result<()> {
    let out_dir = output_dir()?;
    let jtfs = TimeFrequencyScattering1D::try_new(JtfsConfig::new(n))
        .map_err(|e| anyhow!("failed to configure length {n}: {e}"))?;
    let rows: Vec<MetaRow> = jtfs
        .meta()
        .into_iter()
        .map(|info| MetaRow {
            family: info.meta.family.label().to_string(),
            n1: info.meta.n1,
            n2: info.meta.n2,
            n1_fr: info.meta.n1_fr,
            row: info.meta.row,
            stride_t: info.meta.stride_t,
            stride_fr: info.meta.stride_fr,
            shape: info.shape,
        })
        .collect();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &rows {
        *counts.entry(row.family.as_str()).or_default() += 1;
    }
    for family in PathFamily::JOINT_TIME_FREQUENCY {
        info!(
            family = family.label(),
            paths = counts.get(family.label()).copied().unwrap_or(0),
            "meta"
        );
    }
    let path = out_dir.join("meta.json");
    fs::write(&path, serde_json::to_string_pretty(&rows)?)
        .with_context(|| format!("writing {}", path.display()))
}

fn tensor_shapes(out: &ScatteringOutput) -> BTreeMap<String, Vec<usize>> {
    let mut shapes = BTreeMap::new();
    match out {
        ScatteringOutput::List(list) => {
            if let Some(first) = list.first() {
                shapes.insert("first".to_string(), first.coef.shape().to_vec());
            }
        }
        ScatteringOutput::Array(array) => {
            shapes.insert("array".to_string(), array.shape().to_vec());
        }
        ScatteringOutput::GroupedList { first_order, joint } => {
            if let Some(c) = first_order.first() {
                shapes.insert("first_order".to_string(), c.coef.shape().to_vec());
            }
            if let Some(c) = joint.first() {
                shapes.insert("joint".to_string(), c.coef.shape().to_vec());
            }
        }
        ScatteringOutput::GroupedArray { first_order, joint } => {
            shapes.insert("first_order".to_string(), first_order.shape().to_vec());
            shapes.insert("joint".to_string(), joint.shape().to_vec());
        }
        ScatteringOutput::DictList(map) => {
            for (family, group) in map {
                if let Some(c) = group.first() {
                    shapes.insert(family.label().to_string(), c.coef.shape().to_vec());
                }
            }
        }
        ScatteringOutput::DictArray(map) => {
            for (family, array) in map {
                shapes.insert(family.label().to_string(), array.shape().to_vec());
            }
        }
    }
    shapes
}

fn ensure_same_output(case_id: &str, a: &ScatteringOutput, b: &ScatteringOutput) -> Result<()> {
    if a.path_count() != b.path_count() {
        bail!(
            "case {case_id} has mismatched path counts: left={}, right={}",
            a.path_count(),
            b.path_count()
        );
    }
    if a != b {
        bail!("case {case_id} is not deterministic across calls");
    }
    Ok(())
}

fn benchmark_avg_ns<F>(iters: usize, mut f: F) -> Result<f64>
where
    F: FnMut() -> Result<()>,
{
    let start = Instant::now();
    for _ in 0..iters {
        f()?;
    }
    Ok(start.elapsed().as_nanos() as f64 / iters as f64)
}

fn write_summary_csv(path: &Path, rows: &[ShapeRow]) -> Result<()> {
    let mut out = String::new();
    out.push_str("case_id,shape,out_type,out_3d,average_fr,path_count,families,tensors,avg_ns\n");
    for row in rows {
        let tensors = row
            .tensors
            .iter()
            .map(|(k, v)| format!("{k}={v:?}"))
            .collect::<Vec<_>>()
            .join(";");
        out.push_str(&format!(
            "{},{},{},{},{},{},\"{}\",\"{}\",{:.3}\n",
            row.case_id,
            row.shape,
            row.out_type,
            row.out_3d,
            row.average_fr,
            row.path_count,
            row.families.join(";"),
            tensors,
            row.avg_ns
        ));
    }
    fs::write(path, out).with_context(|| format!("writing {}", path.display()))
}
