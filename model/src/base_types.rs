use derive_more::{Display, From};

pub type Idx = u32;
pub type PassengerCount = u64;
pub type InspectorCount = u32;

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "st{}", _0)]
pub struct StationIdx(Idx);

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "n{}", _0)]
pub struct NodeIdx(Idx);

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "e{}", _0)]
pub struct EdgeIdx(Idx);

#[derive(Display, From, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display(fmt = "ins{}", _0)]
pub struct InspectorIdx(Idx);

impl StationIdx {
    pub fn idx(&self) -> usize {
        self.0 as usize
    }
}

impl NodeIdx {
    pub fn idx(&self) -> usize {
        self.0 as usize
    }
}

impl EdgeIdx {
    pub fn idx(&self) -> usize {
        self.0 as usize
    }
}

impl InspectorIdx {
    pub fn idx(&self) -> usize {
        self.0 as usize
    }
}
