//! 地图图例的编号序列

/// 依次产生图例标签
pub trait LabelSequence {
    fn next_label(&mut self) -> String;
}

/// 阿拉伯数字序列：1, 2, 3...
#[derive(Debug, Clone)]
pub struct ArabicNumberSequence {
    number: u32,
}

impl Default for ArabicNumberSequence {
    fn default() -> Self {
        Self { number: 1 }
    }
}

impl ArabicNumberSequence {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LabelSequence for ArabicNumberSequence {
    fn next_label(&mut self) -> String {
        let label = self.number.to_string();
        self.number += 1;
        label
    }
}
