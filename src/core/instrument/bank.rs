use std::fmt;

use super::{Instrument, InstrumentKind};
use crate::error::{Result, SynthError};

/// Index of an instrument inside an [`InstrumentBank`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(pub(crate) usize);

impl InstrumentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena of instruments. Built once before playback starts and shared
/// read-only between the control thread and the audio thread.
#[derive(Debug, Clone, Default)]
pub struct InstrumentBank {
    instruments: Vec<Instrument>,
}

impl InstrumentBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bank holding one instrument of every kind, in [`InstrumentKind::ALL`]
    /// order.
    pub fn standard() -> Self {
        let mut bank = Self::new();
        for kind in InstrumentKind::ALL {
            bank.add(Instrument::new(kind));
        }
        bank
    }

    pub fn add(&mut self, instrument: Instrument) -> InstrumentId {
        self.instruments.push(instrument);
        InstrumentId(self.instruments.len() - 1)
    }

    pub fn get(&self, id: InstrumentId) -> Option<&Instrument> {
        self.instruments.get(id.0)
    }

    /// First instrument of the given kind.
    pub fn find(&self, kind: InstrumentKind) -> Option<InstrumentId> {
        self.instruments
            .iter()
            .position(|inst| inst.kind == kind)
            .map(InstrumentId)
    }

    /// Like [`find`](Self::find), as an error when the kind is missing.
    pub fn require(&self, kind: InstrumentKind) -> Result<InstrumentId> {
        self.find(kind)
            .ok_or_else(|| SynthError::Config(format!("no {} instrument registered", kind.name())))
    }

    /// Validate an id handed in from outside.
    pub fn check(&self, id: InstrumentId) -> Result<InstrumentId> {
        if id.0 < self.instruments.len() {
            Ok(id)
        } else {
            Err(SynthError::UnknownInstrument(id.0))
        }
    }

    /// Look up an instrument by its kind name, e.g. `"kick"`.
    pub fn by_name(&self, name: &str) -> Option<InstrumentId> {
        self.instruments
            .iter()
            .position(|inst| inst.kind.name().eq_ignore_ascii_case(name))
            .map(InstrumentId)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (InstrumentId, &Instrument)> {
        self.instruments
            .iter()
            .enumerate()
            .map(|(i, inst)| (InstrumentId(i), inst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_bank_has_every_kind() {
        let bank = InstrumentBank::standard();
        assert_eq!(bank.len(), InstrumentKind::ALL.len());
        for kind in InstrumentKind::ALL {
            let id = bank.find(kind).unwrap();
            assert_eq!(bank.get(id).unwrap().kind, kind);
            assert_eq!(bank.by_name(kind.name()), Some(id));
        }
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let bank = InstrumentBank::standard();
        assert!(bank.get(InstrumentId(99)).is_none());
        assert!(matches!(
            bank.check(InstrumentId(99)),
            Err(SynthError::UnknownInstrument(99))
        ));
        assert!(InstrumentBank::new().require(InstrumentKind::Kick).is_err());
    }
}
