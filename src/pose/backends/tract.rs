#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::frame::Frame;
use crate::pose::backend::PoseBackend;
use crate::pose::{Joint, Keypoint, Subject};

/// Tract-based MoveNet SinglePose backend.
///
/// Expects an ONNX export taking a `[1, S, S, 3]` float tensor of 0..255 RGB
/// values and producing `[1, 1, 17, 3]` rows of normalised `(y, x, score)`.
/// Keypoints are scaled back to frame pixel coordinates.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, input_size: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, side, side, 3)))
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self { model, input_size })
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let img = frame
            .to_image()
            .ok_or_else(|| anyhow!("frame buffer does not match {}x{}", frame.width, frame.height))?;
        let resized = imageops::resize(&img, self.input_size, self.input_size, FilterType::Triangle);
        let side = self.input_size as usize;
        let input = tract_ndarray::Array4::from_shape_fn((1, side, side, 3), |(_, y, x, c)| {
            resized.get_pixel(x as u32, y as u32)[c] as f32
        });
        Ok(input.into_tensor())
    }

    fn decode(&self, outputs: TVec<TValue>, frame: &Frame) -> Result<Subject> {
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let rows = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let flat: Vec<f32> = rows.iter().copied().collect();
        if flat.len() < Joint::ALL.len() * 3 {
            return Err(anyhow!(
                "expected at least {} output values, received {}",
                Joint::ALL.len() * 3,
                flat.len()
            ));
        }

        let keypoints = Joint::ALL
            .iter()
            .zip(flat.chunks_exact(3))
            .map(|(joint, row)| {
                Keypoint::named(
                    *joint,
                    row[1] * frame.width as f32,
                    row[0] * frame.height as f32,
                    row[2],
                )
            })
            .collect();
        Ok(Subject::new(keypoints))
    }
}

impl PoseBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: &Frame, max_subjects: usize) -> Result<Vec<Subject>> {
        if max_subjects == 0 || frame.has_no_area() {
            return Ok(Vec::new());
        }
        let input = self.build_input(frame)?;
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        Ok(vec![self.decode(outputs, frame)?])
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = Frame::blank(self.input_size, self.input_size, 0);
        self.detect(&blank, 1).map(|_| ())
    }
}
