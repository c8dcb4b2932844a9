//! Drives a CalibrationProcedure over the live frame stream.

use std::time::Duration;

use crate::calibration::{
    completion_prompt, CalibrationProcedure, CalibrationProgress, CalibrationReport,
    CalibrationStage, CaptureStatus, StageOutcome,
};
use crate::display::{DisplayUpdate, Indicator};
use crate::engine::context::EngineContext;
use crate::error::{log_calibration_error, CalibrationError};

/// Run all four stages and build the report
///
/// The analyzer profile is updated after every stage so later stages (and
/// the debug display) already score against what was measured.
///
/// # Errors
/// * `Cancelled` - Stop requested mid-calibration; the previous profile is kept
pub fn run_calibration(ctx: &mut EngineContext) -> Result<CalibrationReport, CalibrationError> {
    let mut procedure = CalibrationProcedure::new(&ctx.config);
    let previous = ctx.stream.profile().clone();

    let result = run_stages(ctx, &mut procedure).and_then(|_| procedure.finish());
    let profile = match result {
        Ok(profile) => profile,
        Err(err) => {
            log_calibration_error(&err, "run_calibration");
            ctx.stream.set_profile(previous);
            return Err(err);
        }
    };

    ctx.stream.set_profile(profile.clone());
    let report = CalibrationReport::new(&profile, &ctx.config.session);
    log::info!(
        "[Calibration] Complete: inhale {:.1}s, exhale {:.1}s. {}",
        report.measured_inhale_secs,
        report.measured_exhale_secs,
        report.hint
    );
    ctx.show(DisplayUpdate::CalibrationReport(report.clone()));
    Ok(report)
}

fn run_stages(
    ctx: &mut EngineContext,
    procedure: &mut CalibrationProcedure,
) -> Result<(), CalibrationError> {
    while let Some(stage) = procedure.current_stage() {
        let span = tracing::info_span!("calibration_stage", stage = stage.display_name());
        let _guard = span.enter();

        let outcome = run_stage(ctx, procedure, stage)?;
        ctx.stream.set_profile(procedure.profile().clone());

        if !ctx.narrate(&completion_prompt(stage, &outcome)) {
            return Err(cancelled(stage));
        }
        procedure.advance();
    }
    Ok(())
}

fn run_stage(
    ctx: &mut EngineContext,
    procedure: &mut CalibrationProcedure,
    stage: CalibrationStage,
) -> Result<StageOutcome, CalibrationError> {
    ctx.show(DisplayUpdate::CalibrationProgress(CalibrationProgress::new(
        stage, 0.0,
    )));
    if !ctx.narrate(stage.prompt()) {
        return Err(cancelled(stage));
    }
    ctx.show(DisplayUpdate::Instruction(stage.instruction().to_string()));

    procedure.begin_capture(ctx.now_ms())?;
    let settle = Duration::from_millis(ctx.config.calibration.settle_ms);
    if !ctx.wait(settle) {
        return Err(cancelled(stage));
    }

    let poll = ctx.config.calibration.poll_period();
    loop {
        if ctx.is_stopped() {
            return Err(cancelled(stage));
        }
        let frame = ctx.sample();
        match procedure.consume(&frame.features, frame.timestamp_ms) {
            Some(CaptureStatus::Capturing { percent }) => {
                ctx.show(DisplayUpdate::CalibrationProgress(CalibrationProgress::new(
                    stage, percent,
                )));
                ctx.show(DisplayUpdate::SphereFill {
                    indicator: Indicator::Calibration,
                    percent,
                });
            }
            Some(CaptureStatus::Finished(outcome)) => {
                ctx.show(DisplayUpdate::CalibrationProgress(CalibrationProgress::new(
                    stage, 100.0,
                )));
                return Ok(outcome);
            }
            None => return Err(CalibrationError::NotComplete),
        }
        if !ctx.tick(poll) {
            return Err(cancelled(stage));
        }
    }
}

fn cancelled(stage: CalibrationStage) -> CalibrationError {
    CalibrationError::Cancelled {
        stage: stage.display_name().to_string(),
    }
}
