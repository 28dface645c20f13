// 该文件是 DermaScan （皮肤镜） 项目的一部分。
// src/task.rs - 任务驱动
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{model::Model, output::Render};

const WARMUP_RUNS: usize = 2;

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    let inferred = now.elapsed();
    info!("推理完成，耗时: {:.2?}", inferred);
    output.render_result(&frame, &result)?;
    info!("输出完成，耗时: {:.2?}", now.elapsed() - inferred);

    Ok(())
  }
}

/// 对同一输入重复推理，统计去掉预热后的平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat: 100 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat;
    self
  }
}

/// 去掉预热次数后的平均耗时，样本不足时返回 `None`
pub fn mean_after_warmup(times: &[Duration]) -> Option<Duration> {
  let measured = times.get(WARMUP_RUNS..)?;
  if measured.is_empty() {
    return None;
  }
  Some(measured.iter().sum::<Duration>() / measured.len() as u32)
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入图像"))?;
    info!("输入图像获取成功，重复推理 {} 次...", self.repeat);
    let mut times = Vec::with_capacity(self.repeat);
    let mut last = None;
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    match mean_after_warmup(&times) {
      Some(mean) => warn!("平均推理时间: {:.2?}", mean),
      None => warn!("推理次数不足 {} 次, 不统计平均时间", WARMUP_RUNS + 1),
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
      info!("输出完成");
    }

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  #[derive(Default)]
  struct Counter {
    calls: Cell<usize>,
  }

  impl Model for &Counter {
    type Input = u8;
    type Output = u8;
    type Error = std::io::Error;

    fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
      self.calls.set(self.calls.get() + 1);
      Ok(input + 1)
    }
  }

  impl Render<u8, u8> for &Counter {
    type Error = std::io::Error;

    fn render_result(&self, frame: &u8, result: &u8) -> Result<(), Self::Error> {
      assert_eq!(*result, frame + 1);
      self.calls.set(self.calls.get() + 1);
      Ok(())
    }
  }

  #[test]
  fn one_shot_runs_once() {
    let (model, output) = (Counter::default(), Counter::default());
    OneShotTask
      .run_task(std::iter::once(1u8), &model, &output)
      .unwrap();
    assert_eq!(model.calls.get(), 1);
    assert_eq!(output.calls.get(), 1);
  }

  #[test]
  fn one_shot_requires_input() {
    let (model, output) = (Counter::default(), Counter::default());
    assert!(OneShotTask.run_task(std::iter::empty::<u8>(), &model, &output).is_err());
  }

  #[test]
  fn repeat_shot_renders_last_result_once() {
    let (model, output) = (Counter::default(), Counter::default());
    RepeatShotTask::default()
      .with_repeat(5)
      .run_task(std::iter::once(7u8), &model, &output)
      .unwrap();
    assert_eq!(model.calls.get(), 5);
    assert_eq!(output.calls.get(), 1);
  }

  #[test]
  fn mean_skips_warmup() {
    let ms = Duration::from_millis;
    assert_eq!(mean_after_warmup(&[ms(100), ms(50), ms(10), ms(20)]), Some(ms(15)));
    assert_eq!(mean_after_warmup(&[ms(100), ms(50)]), None);
    assert_eq!(mean_after_warmup(&[]), None);
  }
}
