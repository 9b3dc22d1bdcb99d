//! Diameter and height classes (Sturges rule).

use serde::Serialize;

/// Equal-width class intervals.
///
/// The first interval is closed (`[a, b]`), the others are open on the left
/// (`(a, b]`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassIntervals {
    edges: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassFrequency {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl ClassIntervals {
    /// Sturges classes over `values`, starting no lower than `minimum`.
    ///
    /// Non-finite values are ignored; fewer than two values yield `None`.
    pub fn sturges(values: &[f64], minimum: f64) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.len() < 2 {
            return None;
        }
        let k = sturges_class_count(finite.len());
        let lo = finite.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let xmin = lo.max(minimum);
        let xmax = if hi <= xmin { xmin + 1e-6 } else { hi };
        let width = (xmax - xmin) / k as f64;
        let mut edges: Vec<f64> = (0..k).map(|i| xmin + width * i as f64).collect();
        edges.push(xmax);
        Some(Self { edges })
    }

    pub fn len(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bounds(&self, index: usize) -> (f64, f64) {
        (self.edges[index], self.edges[index + 1])
    }

    /// Index of the class containing `value`.
    pub fn classify(&self, value: f64) -> Option<usize> {
        if !value.is_finite() {
            return None;
        }
        let first = self.edges[0];
        if value < first || value > self.edges[self.len()] {
            return None;
        }
        if value == first {
            return Some(0);
        }
        (0..self.len()).find(|&i| {
            let (lower, upper) = self.bounds(i);
            value > lower && value <= upper
        })
    }

    pub fn label(&self, index: usize) -> String {
        let (lower, upper) = self.bounds(index);
        let open = if index == 0 { '[' } else { '(' };
        format!("{open}{lower:.2}, {upper:.2}]")
    }

    pub fn label_of(&self, value: f64) -> Option<String> {
        self.classify(value).map(|i| self.label(i))
    }

    /// Count of `values` per class.
    pub fn frequencies(&self, values: &[f64]) -> Vec<ClassFrequency> {
        let mut counts = vec![0usize; self.len()];
        for idx in values.iter().filter_map(|v| self.classify(*v)) {
            counts[idx] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| {
                let (lower, upper) = self.bounds(i);
                ClassFrequency {
                    label: self.label(i),
                    lower,
                    upper,
                    count,
                }
            })
            .collect()
    }
}

/// `max(1, round(1 + 3.322 · log10 n))`.
pub fn sturges_class_count(n: usize) -> usize {
    let k = (1.0 + 3.322 * (n as f64).log10()).round();
    (k as usize).max(1)
}
