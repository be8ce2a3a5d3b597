use std::ops::Range;

use reqwest::Url;
use upload_types::PartNumber;

use crate::error::{Result, UploadClientError};

/// One contiguous byte-range slice of the source file, bound for a specific
/// pre-authorized target.
#[derive(Debug, Clone)]
pub struct PartTask {
    /// 1-based part number; also the part's position in the completion
    /// manifest.
    pub part_number: PartNumber,

    /// Half-open byte range `[start, end)` of the source covered by this
    /// part.
    pub byte_range: Range<u64>,

    /// The pre-authorized destination for this part's bytes.
    pub target: Url,
}

impl PartTask {
    pub fn expected_bytes(&self) -> u64 {
        self.byte_range.end - self.byte_range.start
    }
}

/// Derives the per-part byte ranges for an upload plan.
///
/// Part i (zero-based) covers `[i * part_size, min((i + 1) * part_size,
/// file_size))`; the last part is generally smaller than `part_size`.  The
/// number of targets handed out by the coordinator must match the part count
/// computed from the sizes; anything else means the plan is corrupt.
pub fn plan_parts(file_size: u64, part_size: u64, targets: &[String]) -> Result<Vec<PartTask>> {
    if file_size == 0 || part_size == 0 {
        return Err(UploadClientError::InvalidArguments);
    }

    let n_parts = file_size.div_ceil(part_size) as usize;
    if n_parts != targets.len() {
        return Err(UploadClientError::PlanMismatch {
            n_parts,
            n_targets: targets.len(),
        });
    }

    targets
        .iter()
        .enumerate()
        .map(|(i, target)| {
            let start = i as u64 * part_size;
            let end = (start + part_size).min(file_size);

            Ok(PartTask {
                part_number: i as PartNumber + 1,
                byte_range: start..end,
                target: Url::parse(target)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("https://storage.example/parts/{i}")).collect()
    }

    fn assert_plan_covers(tasks: &[PartTask], file_size: u64) {
        let mut expected_start = 0;
        for (i, task) in tasks.iter().enumerate() {
            assert_eq!(task.part_number, i as u32 + 1);
            assert_eq!(task.byte_range.start, expected_start);
            assert!(task.expected_bytes() > 0);
            expected_start = task.byte_range.end;
        }
        assert_eq!(expected_start, file_size);
        assert_eq!(tasks.iter().map(|t| t.expected_bytes()).sum::<u64>(), file_size);
    }

    #[test]
    fn test_exact_multiple_of_part_size() {
        let tasks = plan_parts(15_000_000, 5_000_000, &targets(3)).unwrap();

        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.expected_bytes() == 5_000_000));
        assert_plan_covers(&tasks, 15_000_000);
    }

    #[test]
    fn test_last_part_is_smaller() {
        let tasks = plan_parts(12, 5, &targets(3)).unwrap();

        let sizes: Vec<u64> = tasks.iter().map(|t| t.expected_bytes()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_plan_covers(&tasks, 12);
    }

    #[test]
    fn test_single_part_below_part_size() {
        let tasks = plan_parts(3, 5, &targets(1)).unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].byte_range, 0..3);
    }

    #[test]
    fn test_ranges_cover_source_for_varied_sizes() {
        for (file_size, part_size) in [(1u64, 1u64), (7, 3), (1024, 100), (5_000_001, 5_000_000), (65_536, 4_096)] {
            let n_parts = file_size.div_ceil(part_size) as usize;
            let tasks = plan_parts(file_size, part_size, &targets(n_parts)).unwrap();
            assert_plan_covers(&tasks, file_size);
        }
    }

    #[test]
    fn test_target_count_mismatch_is_rejected() {
        let err = plan_parts(12, 5, &targets(2)).unwrap_err();
        assert!(matches!(err, UploadClientError::PlanMismatch { n_parts: 3, n_targets: 2 }));
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        assert!(matches!(
            plan_parts(0, 5, &targets(0)),
            Err(UploadClientError::InvalidArguments)
        ));
        assert!(matches!(
            plan_parts(10, 0, &targets(1)),
            Err(UploadClientError::InvalidArguments)
        ));
    }
}
