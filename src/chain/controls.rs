//! Writable side of a live chain.
//!
//! [`ChainControls`] owns one [`Param`] cell per stage.  Values are stored in
//! the units the audio thread consumes:
//!
//! | Stage        | Cell value          |
//! |--------------|---------------------|
//! | gain stages  | `percent / 100`     |
//! | equalizer    | gain in dB          |
//! | balance      | `balance / 100`     |
//! | analysis tap | unused (always 0)   |
//!
//! Equalizer stages are addressed through a `Band → StageId` map fixed at
//! construction, never by position.

use std::collections::BTreeMap;

use crate::audio::percent_to_linear;
use crate::params::{Band, ParameterSet};

use super::stage::{Param, StageId, StageKind};

// ---------------------------------------------------------------------------
// ParameterPush
// ---------------------------------------------------------------------------

/// One scalar update for one stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterPush {
    InputGain(f32),
    OutputGain(f32),
    Balance(i32),
    Band(Band, f32),
}

impl ParameterPush {
    /// Every push needed to bring a chain to `params`, in the order input
    /// gain, output gain, balance, then each band ascending.
    pub fn ordered(params: &ParameterSet) -> Vec<ParameterPush> {
        let mut pushes = Vec::with_capacity(3 + Band::COUNT);
        pushes.push(ParameterPush::InputGain(params.input_gain));
        pushes.push(ParameterPush::OutputGain(params.output_gain));
        pushes.push(ParameterPush::Balance(params.balance));
        pushes.extend(params.eq.iter().map(|(band, db)| ParameterPush::Band(band, db)));
        pushes
    }
}

// ---------------------------------------------------------------------------
// ChainControls
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ChainControls {
    kinds: Vec<StageKind>,
    cells: Vec<Param>,
    input_gain: StageId,
    output_gain: StageId,
    balance: StageId,
    bands: BTreeMap<Band, StageId>,
}

impl ChainControls {
    /// Lay out cells for the fixed chain order and load `params` into them.
    pub(crate) fn new(params: &ParameterSet) -> Self {
        let kinds = StageKind::chain_order();
        let cells = kinds.iter().map(|_| Param::default()).collect();

        let find = |wanted: StageKind| {
            kinds
                .iter()
                .position(|&k| k == wanted)
                .map(StageId)
                .unwrap_or(StageId(0))
        };
        let input_gain = find(StageKind::InputGain);
        let output_gain = find(StageKind::OutputGain);
        let balance = find(StageKind::Balance);
        let bands = kinds
            .iter()
            .enumerate()
            .filter_map(|(i, kind)| match kind {
                StageKind::Equalizer(band) => Some((*band, StageId(i))),
                _ => None,
            })
            .collect();

        let controls = Self {
            kinds,
            cells,
            input_gain,
            output_gain,
            balance,
            bands,
        };
        controls.apply(params);
        controls
    }

    /// Write one value to its stage.
    pub fn push(&self, push: ParameterPush) {
        match push {
            ParameterPush::InputGain(percent) => {
                self.cell(self.input_gain).set(percent_to_linear(percent))
            }
            ParameterPush::OutputGain(percent) => {
                self.cell(self.output_gain).set(percent_to_linear(percent))
            }
            ParameterPush::Balance(balance) => self.cell(self.balance).set(balance as f32 / 100.0),
            ParameterPush::Band(band, db) => {
                if let Some(&id) = self.bands.get(&band) {
                    self.cell(id).set(db);
                }
            }
        }
    }

    /// Push every parameter class in [`ParameterPush::ordered`] order.
    pub fn apply(&self, params: &ParameterSet) {
        for push in ParameterPush::ordered(params) {
            self.push(push);
        }
    }

    /// Current cell value of `id`.
    pub fn value(&self, id: StageId) -> f32 {
        self.cells.get(id.0).map(Param::get).unwrap_or(0.0)
    }

    /// The equalizer stage bound to `band`.
    pub fn stage_for_band(&self, band: Band) -> Option<StageId> {
        self.bands.get(&band).copied()
    }

    pub fn input_gain_stage(&self) -> StageId {
        self.input_gain
    }

    pub fn output_gain_stage(&self) -> StageId {
        self.output_gain
    }

    pub fn balance_stage(&self) -> StageId {
        self.balance
    }

    /// Stages in chain order.
    pub fn stages(&self) -> impl Iterator<Item = (StageId, StageKind)> + '_ {
        self.kinds.iter().enumerate().map(|(i, &k)| (StageId(i), k))
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Copy every cell into `out` (resized to the stage count).
    pub(crate) fn snapshot(&self, out: &mut Vec<f32>) {
        out.clear();
        out.extend(self.cells.iter().map(Param::get));
    }

    fn cell(&self, id: StageId) -> &Param {
        &self.cells[id.0]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
