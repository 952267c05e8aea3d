//! Packaging of the coefficient set into the requested layout.
//!
//! This is the only place where coefficients of different shapes meet. The
//! cascade hands over one `(batch, rows, time)` tensor per path; the
//! assembler flattens or groups rows, then lists, stacks, or keys them by
//! family.

use std::collections::BTreeMap;

use ndarray::{Array, Array3, Array4, ArrayD, ArrayViewD, Axis, Dimension};
use scatter_rs_core::backend::Backend;

use super::cascade::{BranchOutput, ExecResult};
use super::config::OutType;
use super::path::{Coefficient, PathFamily, PathInfo, PathMeta};
use crate::kernel::ExecInvariantViolation;

/// Coefficients in the requested layout.
#[derive(Debug, Clone, PartialEq)]
pub enum ScatteringOutput {
    /// `list`: one record per path in fixed order.
    List(Vec<Coefficient>),
    /// `array`: paths stacked as `(paths, batch, time)`.
    Array(Array3<f64>),
    /// `list` with 3-D grouping: S0 and S1 records, then joint records
    /// shaped `(batch, freq, time)`.
    GroupedList {
        /// S0 and S1 records.
        first_order: Vec<Coefficient>,
        /// Joint records.
        joint: Vec<Coefficient>,
    },
    /// `array` with 3-D grouping.
    GroupedArray {
        /// `(paths, batch, time)` over S0 and S1.
        first_order: Array3<f64>,
        /// `(paths, batch, freq, time)` over the joint families.
        joint: Array4<f64>,
    },
    /// `dict:list`: records keyed by family.
    DictList(BTreeMap<PathFamily, Vec<Coefficient>>),
    /// `dict:array`: per-family stacks keyed by family.
    DictArray(BTreeMap<PathFamily, ArrayD<f64>>),
}

impl ScatteringOutput {
    /// Number of stacked or listed records.
    pub fn path_count(&self) -> usize {
        match self {
            ScatteringOutput::List(list) => list.len(),
            ScatteringOutput::Array(array) => array.len_of(Axis(0)),
            ScatteringOutput::GroupedList { first_order, joint } => first_order.len() + joint.len(),
            ScatteringOutput::GroupedArray { first_order, joint } => {
                first_order.len_of(Axis(0)) + joint.len_of(Axis(0))
            }
            ScatteringOutput::DictList(map) => map.values().map(Vec::len).sum(),
            ScatteringOutput::DictArray(map) => map.values().map(|a| a.len_of(Axis(0))).sum(),
        }
    }

    /// Families present, in output order, for the layouts that carry them.
    pub fn families(&self) -> Option<Vec<PathFamily>> {
        match self {
            ScatteringOutput::List(list) => Some(distinct_families(list.iter())),
            ScatteringOutput::GroupedList { first_order, joint } => {
                Some(distinct_families(first_order.iter().chain(joint)))
            }
            ScatteringOutput::DictList(map) => Some(map.keys().copied().collect()),
            ScatteringOutput::DictArray(map) => Some(map.keys().copied().collect()),
            ScatteringOutput::Array(_) | ScatteringOutput::GroupedArray { .. } => None,
        }
    }
}

fn distinct_families<'a>(records: impl Iterator<Item = &'a Coefficient>) -> Vec<PathFamily> {
    let mut families: Vec<PathFamily> = records.map(|c| c.meta.family).collect();
    families.dedup();
    families
}

/// One path across the whole batch, `(batch, rows, time)`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchedPath {
    pub meta: PathMeta,
    pub data: Array3<f64>,
}

/// Stack per-signal outputs path by path along a new batch axis.
pub(crate) fn batch_paths(per_signal: Vec<Vec<BranchOutput>>) -> ExecResult<Vec<BatchedPath>> {
    let mut signals = per_signal.into_iter();
    let Some(first) = signals.next() else {
        return Ok(Vec::new());
    };
    let rest: Vec<Vec<BranchOutput>> = signals.collect();
    first
        .into_iter()
        .enumerate()
        .map(|(i, path)| {
            let mut views = vec![path.data.view()];
            for other in &rest {
                let branch = other.get(i).ok_or(ExecInvariantViolation::InvalidState {
                    reason: "signals of one batch emitted different path sets",
                })?;
                views.push(branch.data.view());
            }
            let expected = path.data.shape();
            if let Some(bad) = views.iter().find(|v| v.shape() != expected) {
                return Err(ExecInvariantViolation::ShapeMismatch {
                    what: path.meta.family.label(),
                    expected: expected.to_vec(),
                    got: bad.shape().to_vec(),
                });
            }
            let data = ndarray::stack(Axis(0), &views).map_err(|_| {
                ExecInvariantViolation::InvalidState {
                    reason: "batch stacking failed",
                }
            })?;
            Ok(BatchedPath {
                meta: path.meta,
                data,
            })
        })
        .collect()
}

/// Split `(rows, time)` shapes into one `(time)` path per row unless joint
/// rows are kept as an explicit axis.
pub(crate) fn flatten_info(plan: Vec<PathInfo>, out_3d: bool) -> Vec<PathInfo> {
    plan.into_iter()
        .flat_map(|info| {
            let rows = info.shape.first().copied().unwrap_or(1);
            let time = info.shape.last().copied().unwrap_or(0);
            let keep_rows = info.meta.family.is_joint() && out_3d;
            let flat: Vec<PathInfo> = if keep_rows {
                vec![info]
            } else if !info.meta.family.is_joint() {
                vec![PathInfo {
                    meta: info.meta,
                    shape: vec![time],
                }]
            } else {
                (0..rows)
                    .map(|row| PathInfo {
                        meta: info.meta.clone().with_row(row),
                        shape: vec![time],
                    })
                    .collect()
            };
            flat
        })
        .collect()
}

/// Output Assembler bound to one backend.
pub(crate) struct Assembler<'a> {
    pub backend: &'a dyn Backend,
    pub out_type: OutType,
    pub out_3d: bool,
}

impl<'a> Assembler<'a> {
    /// Package batched paths in the configured layout.
    pub fn assemble(&self, paths: Vec<BatchedPath>) -> ExecResult<ScatteringOutput> {
        let records = self.records(paths);
        if !self.out_3d {
            return match self.out_type {
                OutType::List => Ok(ScatteringOutput::List(records)),
                OutType::Array => Ok(ScatteringOutput::Array(into_rank(
                    "array",
                    self.concat_families(None, records)?,
                )?)),
                OutType::DictList => Ok(ScatteringOutput::DictList(by_family(records))),
                OutType::DictArray => {
                    Ok(ScatteringOutput::DictArray(self.stack_by_family(records)?))
                }
            };
        }

        match self.out_type {
            OutType::List => {
                let (first_order, joint) =
                    records.into_iter().partition(|c| !c.meta.family.is_joint());
                Ok(ScatteringOutput::GroupedList { first_order, joint })
            }
            OutType::Array => {
                let (first_order, joint): (Vec<_>, Vec<_>) =
                    records.into_iter().partition(|c| !c.meta.family.is_joint());
                Ok(ScatteringOutput::GroupedArray {
                    first_order: into_rank(
                        "S0 and S1",
                        self.concat_families(Some("S0 and S1"), first_order)?,
                    )?,
                    joint: into_rank("joint", self.concat_families(Some("joint"), joint)?)?,
                })
            }
            OutType::DictList => Ok(ScatteringOutput::DictList(by_family(records))),
            OutType::DictArray => {
                Ok(ScatteringOutput::DictArray(self.stack_by_family(records)?))
            }
        }
    }

    /// One record per path, splitting joint rows unless grouping in 3-D.
    fn records(&self, paths: Vec<BatchedPath>) -> Vec<Coefficient> {
        let mut out = Vec::with_capacity(paths.len());
        for path in paths {
            let joint = path.meta.family.is_joint();
            if joint && self.out_3d {
                out.push(Coefficient {
                    meta: path.meta,
                    coef: path.data.into_dyn(),
                });
            } else if !joint {
                out.push(Coefficient {
                    meta: path.meta,
                    coef: path.data.index_axis(Axis(1), 0).to_owned().into_dyn(),
                });
            } else {
                for (row, view) in path.data.axis_iter(Axis(1)).enumerate() {
                    out.push(Coefficient {
                        meta: path.meta.clone().with_row(row),
                        coef: view.to_owned().into_dyn(),
                    });
                }
            }
        }
        out
    }

    /// Stack one family's records along a new leading axis.
    fn stack(&self, family: PathFamily, records: &[Coefficient]) -> ExecResult<ArrayD<f64>> {
        let expected = records
            .first()
            .map(|c| c.coef.shape().to_vec())
            .ok_or(ExecInvariantViolation::InvalidState {
                reason: "no coefficients to stack",
            })?;
        if let Some(bad) = records.iter().find(|c| c.coef.shape() != expected.as_slice()) {
            return Err(ExecInvariantViolation::ShapeMismatch {
                what: family.label(),
                expected,
                got: bad.coef.shape().to_vec(),
            });
        }
        let views: Vec<ArrayViewD<'_, f64>> = records.iter().map(|c| c.coef.view()).collect();
        Ok(self.backend.stack(&views)?)
    }

    fn stack_by_family(
        &self,
        records: Vec<Coefficient>,
    ) -> ExecResult<BTreeMap<PathFamily, ArrayD<f64>>> {
        by_family(records)
            .into_iter()
            .map(|(family, group)| Ok((family, self.stack(family, &group)?)))
            .collect()
    }

    /// Stack each family, then join the stacks along the path axis in
    /// family order. Families must agree on every non-path axis.
    fn concat_families(
        &self,
        what: Option<&'static str>,
        records: Vec<Coefficient>,
    ) -> ExecResult<ArrayD<f64>> {
        let stacks = self.stack_by_family(records)?;
        let mut families = stacks.iter();
        let (_, head) = families.next().ok_or(ExecInvariantViolation::InvalidState {
            reason: "no coefficients to stack",
        })?;
        let expected = head.shape()[1..].to_vec();
        if let Some((family, bad)) = families.find(|(_, a)| a.shape()[1..] != expected[..]) {
            return Err(ExecInvariantViolation::ShapeMismatch {
                what: what.unwrap_or(family.label()),
                expected,
                got: bad.shape()[1..].to_vec(),
            });
        }
        let views: Vec<ArrayViewD<'_, f64>> = stacks.values().map(|a| a.view()).collect();
        Ok(self.backend.concatenate(&views, 0)?)
    }
}

fn into_rank<D: Dimension>(what: &'static str, array: ArrayD<f64>) -> ExecResult<Array<f64, D>> {
    let got = array.shape().to_vec();
    array
        .into_dimensionality::<D>()
        .map_err(|_| ExecInvariantViolation::ShapeMismatch {
            what,
            expected: Vec::new(),
            got,
        })
}

fn by_family(records: Vec<Coefficient>) -> BTreeMap<PathFamily, Vec<Coefficient>> {
    let mut map: BTreeMap<PathFamily, Vec<Coefficient>> = BTreeMap::new();
    for record in records {
        map.entry(record.meta.family).or_default().push(record);
    }
    map
}
