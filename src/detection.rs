//! Source code page detection
//!
//! Detection decodes the whole input under every candidate code page and
//! keeps the one producing the fewest replacement characters. Candidates are
//! scanned in list order with a strict comparison, so the earliest candidate
//! wins a tie.
//!
//! The plausibility check is a cheaper, looser gate meant to run before a
//! conversion: it only looks at a prefix of the input and accepts it as soon
//! as one candidate decodes it with few enough replacement characters.

use tracing::debug;

use crate::CodePage;
use crate::translator::Translator;

/// Bytes inspected by the plausibility check
pub const DEFAULT_SAMPLE_SIZE: usize = 4096;

/// Replacement ratio below which a candidate makes a sample plausible
pub const DEFAULT_PLAUSIBILITY_THRESHOLD: f64 = 0.2;

/// Result of code page detection
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    /// Chosen code page
    pub codepage: CodePage,
    /// Replacement characters produced by the chosen code page
    pub replacements: usize,
    /// Whether no candidate could be scored and the fallback was used
    pub fallback: bool,
    /// Every scored candidate with its replacement count, in scan order
    pub candidates: Vec<(CodePage, usize)>,
}

/// Code page detector over a fixed candidate list
#[derive(Debug, Clone)]
pub struct EncodingDetector {
    candidates: Vec<CodePage>,
    /// Maximum bytes inspected by the plausibility check
    max_sample_size: usize,
    threshold: f64,
}

impl Default for EncodingDetector {
    fn default() -> Self {
        Self {
            candidates: CodePage::ALL.to_vec(),
            max_sample_size: DEFAULT_SAMPLE_SIZE,
            threshold: DEFAULT_PLAUSIBILITY_THRESHOLD,
        }
    }
}

impl EncodingDetector {
    /// Create a detector over every supported code page
    pub fn new() -> Self {
        Self::default()
    }

    /// Create detector with custom plausibility sample size
    pub fn with_sample_size(mut self, max_sample_size: usize) -> Self {
        self.max_sample_size = max_sample_size;
        self
    }

    /// Restrict detection to the given candidates, scanned in the given order
    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = CodePage>) -> Self {
        self.candidates = candidates.into_iter().collect();
        self
    }

    /// Change the replacement ratio a plausible sample must stay below
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Candidate code pages in scan order
    pub fn candidates(&self) -> &[CodePage] {
        &self.candidates
    }

    /// Plausibility sample size in bytes
    pub fn sample_size(&self) -> usize {
        self.max_sample_size
    }

    /// Detect the code page of the given data
    ///
    /// The full input is scored against every candidate. With no candidates
    /// the result is [`CodePage::FALLBACK`].
    pub fn detect(&self, data: &[u8]) -> DetectionResult {
        let mut best: Option<(CodePage, usize)> = None;
        let mut candidates = Vec::with_capacity(self.candidates.len());

        for &codepage in &self.candidates {
            let score = Translator::new(codepage).count_replacements(data);
            debug!(codepage = %codepage, replacements = score, "scored candidate");
            candidates.push((codepage, score));

            // strict comparison keeps the earliest candidate on ties
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((codepage, score));
            }
        }

        match best {
            Some((codepage, replacements)) => DetectionResult {
                codepage,
                replacements,
                fallback: false,
                candidates,
            },
            None => DetectionResult {
                codepage: CodePage::FALLBACK,
                replacements: 0,
                fallback: true,
                candidates,
            },
        }
    }

    /// Candidates that decode the sample prefix below the replacement threshold
    pub fn plausible_candidates(&self, data: &[u8]) -> Vec<CodePage> {
        let sample = &data[..data.len().min(self.max_sample_size)];

        self.candidates
            .iter()
            .copied()
            .filter(|&codepage| {
                let replacements = Translator::new(codepage).count_replacements(sample);
                // one character per byte for every table
                let ratio = replacements as f64 / sample.len().max(1) as f64;
                ratio < self.threshold
            })
            .collect()
    }

    /// Whether the data plausibly is text in at least one candidate code page
    pub fn is_plausible(&self, data: &[u8]) -> bool {
        let plausible = self.plausible_candidates(data);
        debug!(
            passing = plausible.len(),
            total = self.candidates.len(),
            "plausibility check"
        );
        !plausible.is_empty()
    }
}

/// Detect the source code page of `raw` over all supported code pages
pub fn detect_encoding(raw: &[u8]) -> CodePage {
    EncodingDetector::new().detect(raw).codepage
}

/// Cheap pre-conversion gate over the first 4096 bytes of the input
pub fn detect_plausibility(first_bytes: &[u8]) -> bool {
    EncodingDetector::new().is_plausible(first_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc_123_cp500(repetitions: usize) -> Vec<u8> {
        [0xC1, 0xC2, 0xC3, 0x40, 0xF1, 0xF2, 0xF3].repeat(repetitions)
    }

    #[test]
    fn test_first_zero_marker_candidate_wins() {
        let result = EncodingDetector::new().detect(&abc_123_cp500(10_000));

        // cp037 decodes every byte and is listed first
        assert_eq!(result.codepage, CodePage::Cp037);
        assert_eq!(result.replacements, 0);
        assert!(!result.fallback);
        assert_eq!(result.candidates.len(), CodePage::ALL.len());
    }

    #[test]
    fn test_restricted_candidates_pick_cp500() {
        let detector =
            EncodingDetector::new().with_candidates([CodePage::Cp500, CodePage::Cp037]);
        let result = detector.detect(&abc_123_cp500(10_000));

        assert_eq!(result.codepage, CodePage::Cp500);
        assert_eq!(result.replacements, 0);
    }

    #[test]
    fn test_fewest_markers_beats_list_order() {
        // bytes 0x80.. are undefined in cp891 but fine in cp037
        let detector = EncodingDetector::new().with_candidates([CodePage::Cp891, CodePage::Cp037]);
        let result = detector.detect(&[0x41, 0x81, 0x82]);

        assert_eq!(result.codepage, CodePage::Cp037);
        assert_eq!(
            result.candidates,
            vec![(CodePage::Cp891, 2), (CodePage::Cp037, 0)]
        );
    }

    #[test]
    fn test_tie_keeps_earliest_candidate() {
        // both leave the whole upper half undefined
        let data = [0x90, 0xA0, 0xB0];
        let forward = EncodingDetector::new().with_candidates([CodePage::Cp891, CodePage::Cp903]);
        let backward = EncodingDetector::new().with_candidates([CodePage::Cp903, CodePage::Cp891]);

        assert_eq!(forward.detect(&data).codepage, CodePage::Cp891);
        assert_eq!(backward.detect(&data).codepage, CodePage::Cp903);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let data: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let detector = EncodingDetector::new();
        assert_eq!(detector.detect(&data), detector.detect(&data));
        assert_eq!(detect_encoding(&data), detect_encoding(&data));
    }

    #[test]
    fn test_no_candidates_falls_back() {
        let result = EncodingDetector::new()
            .with_candidates(Vec::new())
            .detect(&[0x12, 0x34]);

        assert_eq!(result.codepage, CodePage::Cp037);
        assert!(result.fallback);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_plausibility_accepts_ebcdic() {
        assert!(detect_plausibility(&abc_123_cp500(1_000)));
        assert!(detect_plausibility(&[]));
    }

    #[test]
    fn test_plausibility_rejects_unmappable_sample() {
        let detector = EncodingDetector::new().with_candidates([CodePage::Cp891, CodePage::Cp903]);
        let high_bytes: Vec<u8> = (0x80..=0xFFu8).cycle().take(4096).collect();

        assert!(!detector.is_plausible(&high_bytes));
        assert!(detector.plausible_candidates(&high_bytes).is_empty());
    }

    #[test]
    fn test_plausibility_threshold_boundary() {
        let detector = EncodingDetector::new().with_candidates([CodePage::Cp891]);

        // 1 marker in 5 bytes is exactly 20% and must fail
        assert!(!detector.is_plausible(&[0x41, 0x42, 0x43, 0x44, 0x90]));
        // 1 marker in 6 bytes passes
        assert!(detector.is_plausible(&[0x41, 0x42, 0x43, 0x44, 0x45, 0x90]));
    }

    #[test]
    fn test_plausibility_only_reads_the_sample() {
        let detector = EncodingDetector::new()
            .with_candidates([CodePage::Cp891])
            .with_sample_size(4);
        let mut data = vec![0x41; 4];
        data.extend(std::iter::repeat_n(0x90, 100));

        assert!(detector.is_plausible(&data));
        assert_eq!(detector.sample_size(), 4);
    }
}
