use crate::error::PipelineError;
use image::GrayImage;
use std::collections::VecDeque;

/// Row-major grid of region labels. Label 0 is reserved for background and
/// unlabeled cells; region ids are `1..=max_label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    width: u32,
    height: u32,
    labels: Vec<u32>,
    max_label: u32,
}

impl LabelGrid {
    /// Wrap an externally produced label grid, used as-is.
    pub fn from_raw(width: u32, height: u32, labels: Vec<u32>) -> Result<Self, PipelineError> {
        let expected = width as usize * height as usize;
        if expected == 0 {
            return Err(PipelineError::InvalidInput(
                "label grid dimensions must be non-zero".to_string(),
            ));
        }
        if labels.len() != expected {
            return Err(PipelineError::InvalidInput(format!(
                "label grid has {} cells but {}x{} needs {}",
                labels.len(),
                width,
                height,
                expected
            )));
        }
        let max_label = labels.iter().copied().max().unwrap_or(0);
        Ok(Self {
            width,
            height,
            labels,
            max_label,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Highest label present; 0 when the grid is all background.
    pub fn max_label(&self) -> u32 {
        self.max_label
    }

    pub fn labels(&self) -> &[u32] {
        &self.labels
    }

    pub fn label_at(&self, x: u32, y: u32) -> u32 {
        self.labels[y as usize * self.width as usize + x as usize]
    }

    /// Per-label pixel counts for labels `1..=max_label`, indexed by
    /// `label - 1`. Ids with no cells count 0.
    pub fn pixel_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.max_label as usize];
        for label in &self.labels {
            if *label > 0 {
                counts[(*label - 1) as usize] += 1;
            }
        }
        counts
    }
}

/// Label 4-connected foreground components of a binarized image.
///
/// Scans row-major; each unlabeled white (255) cell starts a breadth-first
/// fill that claims every reachable white neighbor, then the label counter
/// advances. First-encounter order makes the assignment deterministic:
/// relabeling the same image always yields the same grid.
pub fn label_connected_regions(binary: &GrayImage) -> LabelGrid {
    let width = binary.width() as usize;
    let height = binary.height() as usize;
    let len = width * height;
    let pixels = binary.as_raw();

    let mut labels = vec![0u32; len];
    let mut queue = VecDeque::<usize>::new();
    let mut next_label = 1u32;

    for start in 0..len {
        if pixels[start] != 255 || labels[start] != 0 {
            continue;
        }

        labels[start] = next_label;
        queue.push_back(start);

        while let Some(idx) = queue.pop_front() {
            let x = idx % width;
            let y = idx / width;

            if x > 0 {
                let n = idx - 1;
                if pixels[n] == 255 && labels[n] == 0 {
                    labels[n] = next_label;
                    queue.push_back(n);
                }
            }
            if x + 1 < width {
                let n = idx + 1;
                if pixels[n] == 255 && labels[n] == 0 {
                    labels[n] = next_label;
                    queue.push_back(n);
                }
            }
            if y > 0 {
                let n = idx - width;
                if pixels[n] == 255 && labels[n] == 0 {
                    labels[n] = next_label;
                    queue.push_back(n);
                }
            }
            if y + 1 < height {
                let n = idx + width;
                if pixels[n] == 255 && labels[n] == 0 {
                    labels[n] = next_label;
                    queue.push_back(n);
                }
            }
        }

        next_label += 1;
    }

    LabelGrid {
        width: binary.width(),
        height: binary.height(),
        labels,
        max_label: next_label - 1,
    }
}
