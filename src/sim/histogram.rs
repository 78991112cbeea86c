use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistogramBin {
    /// Inclusive lower bound
    pub lower: i64,
    /// Exclusive upper bound
    pub upper: i64,
    pub count: u64,
}

/// Fixed-width histogram of simulated margins, bins aligned to multiples of
/// the width so that 0 always sits on a bin edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarginHistogram {
    pub bin_width: i64,
    pub bins: Vec<HistogramBin>,
}

impl MarginHistogram {
    pub fn from_margins(margins: &[i64], bin_width: i64) -> Self {
        let bin_width = bin_width.max(1);
        let (Some(&min), Some(&max)) = (margins.iter().min(), margins.iter().max()) else {
            return MarginHistogram {
                bin_width,
                bins: Vec::new(),
            };
        };

        let first = min.div_euclid(bin_width);
        let last = max.div_euclid(bin_width);
        let mut bins: Vec<HistogramBin> = (first..=last)
            .map(|k| HistogramBin {
                lower: k * bin_width,
                upper: (k + 1) * bin_width,
                count: 0,
            })
            .collect();

        for m in margins {
            let idx = (m.div_euclid(bin_width) - first) as usize;
            bins[idx].count += 1;
        }

        MarginHistogram { bin_width, bins }
    }

    pub fn total(&self) -> u64 {
        self.bins.iter().map(|b| b.count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_cover_every_margin() {
        let margins = vec![-12, -3, -1, 1, 2, 5, 5, 9, 14, 30];
        let h = MarginHistogram::from_margins(&margins, 5);
        assert_eq!(h.total(), margins.len() as u64);
        assert_eq!(h.bins.first().unwrap().lower, -15);
        assert_eq!(h.bins.last().unwrap().upper, 35);
    }

    #[test]
    fn bins_split_at_zero() {
        let h = MarginHistogram::from_margins(&[-1, 1], 5);
        assert_eq!(
            h.bins,
            vec![
                HistogramBin { lower: -5, upper: 0, count: 1 },
                HistogramBin { lower: 0, upper: 5, count: 1 },
            ]
        );
    }

    #[test]
    fn upper_bound_is_exclusive() {
        let h = MarginHistogram::from_margins(&[4, 5], 5);
        assert_eq!(h.bins.len(), 2);
        assert_eq!(h.bins[0].count, 1);
        assert_eq!(h.bins[1].count, 1);
        assert_eq!(h.bins[1].lower, 5);
    }

    #[test]
    fn empty_input_has_no_bins() {
        let h = MarginHistogram::from_margins(&[], 3);
        assert!(h.bins.is_empty());
        assert_eq!(h.total(), 0);
    }

    #[test]
    fn non_positive_width_is_clamped() {
        let h = MarginHistogram::from_margins(&[3, 3, 4], 0);
        assert_eq!(h.bin_width, 1);
        assert_eq!(h.bins.len(), 2);
        assert_eq!(h.bins[0].count, 2);
    }
}
