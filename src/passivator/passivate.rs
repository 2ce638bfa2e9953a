use super::collaborators::IdentityGuard;
use super::instance::StatefulInstance;
use super::stats::StatsCounters;
use super::{StatefulPassivator, advance};
use crate::capture::{CapturedObject, capture_object};
use crate::codec::{FrameGeneration, PassivationFrame, compress, encode_frame, encode_frame_to_vec};
use crate::core::{BeanId, BeanMetaData, OperationKind, PassivationError, Result};
use crate::failover::FailoverCache;
use log::{debug, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassivationState {
    Idle,
    Building,
    Writing,
    Committed,
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Removed,
    Terminating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassivationOutcome {
    Committed {
        generation: FrameGeneration,
        /// Whether the durable store holds the frame.
        store_written: bool,
        /// Whether the failover cache holds the frame.
        failover_pushed: bool,
    },
    /// Nothing was written.
    Skipped(SkipReason),
}

impl PassivationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

impl StatefulPassivator {
    /// Writes `instance` out under its bean identifier.
    ///
    /// Removed instances and a terminating passivator yield
    /// [`PassivationOutcome::Skipped`]. On failure no entry for the
    /// identifier is left in the store.
    pub fn passivate(
        &self,
        instance: &StatefulInstance,
        bean: &BeanMetaData,
    ) -> Result<PassivationOutcome> {
        let id = instance.bean_id();

        if let Some(reason) = self.skip_reason(instance) {
            StatsCounters::bump(&self.stats.skipped_passivations);
            debug!("passivation of {} skipped: {:?}", id, reason);
            return Ok(PassivationOutcome::Skipped(reason));
        }

        let result = IdentityGuard::push(self.identity.clone(), bean).and_then(|_identity| {
            let _lock = self.locks.passivate()?;
            // The flag may have flipped while queued behind another passivation.
            if self.is_terminating() {
                return Ok(PassivationOutcome::Skipped(SkipReason::Terminating));
            }
            self.run_passivation(id, instance, bean)
        });

        match result {
            Ok(PassivationOutcome::Skipped(reason)) => {
                StatsCounters::bump(&self.stats.skipped_passivations);
                debug!("passivation of {} skipped: {:?}", id, reason);
                Ok(PassivationOutcome::Skipped(reason))
            }
            Ok(outcome) => {
                StatsCounters::bump(&self.stats.passivations);
                debug!("passivated {} ({}): {:?}", id, bean.name, outcome);
                Ok(outcome)
            }
            Err(err) => {
                StatsCounters::bump(&self.stats.passivation_failures);
                Err(err.in_operation(OperationKind::Passivate, id))
            }
        }
    }

    fn skip_reason(&self, instance: &StatefulInstance) -> Option<SkipReason> {
        if instance.is_removed() {
            Some(SkipReason::Removed)
        } else if self.is_terminating() {
            Some(SkipReason::Terminating)
        } else {
            None
        }
    }

    fn run_passivation(
        &self,
        id: &BeanId,
        instance: &StatefulInstance,
        bean: &BeanMetaData,
    ) -> Result<PassivationOutcome> {
        let generation = self.generation_for(bean);
        let mut state = PassivationState::Idle;

        advance(id, &mut state, PassivationState::Building);
        let frame = match self.build_frame(id, instance, bean, generation) {
            Ok(frame) => frame,
            Err(err) => {
                advance(id, &mut state, PassivationState::Aborted);
                return Err(err);
            }
        };

        advance(id, &mut state, PassivationState::Writing);
        match self.write_frame(id, &frame, generation) {
            Ok(outcome) => {
                advance(id, &mut state, PassivationState::Committed);
                Ok(outcome)
            }
            Err(err) => {
                advance(id, &mut state, PassivationState::Aborted);
                self.discard_entry(id, "aborted passivation");
                Err(err)
            }
        }
    }

    /// Assembles the complete frame in memory.
    fn build_frame(
        &self,
        id: &BeanId,
        instance: &StatefulInstance,
        bean: &BeanMetaData,
        generation: FrameGeneration,
    ) -> Result<PassivationFrame> {
        let primary = capture_object(&self.registry, instance.raw_object())?;
        if generation == FrameGeneration::Legacy && !primary.is_native() {
            return Err(PassivationError::Capture {
                type_name: primary.type_name().to_string(),
                field: "<native>".to_string(),
                reason: format!(
                    "bean version {} predates the structured format and needs a native codec",
                    bean.module_version
                ),
            });
        }

        let mut frame = PassivationFrame::new(instance.last_access_time(), primary);
        frame.persistence_context = instance.persistence_context().cloned();

        if generation == FrameGeneration::Structured {
            frame.managed_context = self.managed_context.write_context(id, bean)?;
            frame.interceptors = instance
                .raw_interceptors()
                .map(|interceptors| {
                    interceptors
                        .iter()
                        .map(|interceptor| capture_object(&self.registry, &**interceptor))
                        .collect::<Result<Vec<CapturedObject>>>()
                })
                .transpose()?;
        }

        Ok(frame)
    }

    fn write_frame(
        &self,
        id: &BeanId,
        frame: &PassivationFrame,
        generation: FrameGeneration,
    ) -> Result<PassivationOutcome> {
        let level = self.config.compression_level;

        let Some(cache) = &self.failover else {
            let mut writer = self.store.open_compressed_writer(id, level)?;
            encode_frame(frame, generation, &mut writer)?;
            writer.finish()?;
            return Ok(PassivationOutcome::Committed {
                generation,
                store_written: true,
                failover_pushed: false,
            });
        };

        let compressed = compress(&encode_frame_to_vec(frame, generation)?, level)?;

        let store_result = self.store.write_bytes(id, &compressed);
        if let Err(err) = &store_result {
            warn!("store write for {} failed, relying on failover cache: {}", id, err);
            self.discard_entry(id, "failed store write");
        }

        let pushed = match self.push_to_failover(
            cache.as_ref(),
            id,
            compressed,
            frame.last_access_time,
        ) {
            Ok(()) => {
                StatsCounters::bump(&self.stats.failover_pushes);
                true
            }
            Err(err) => {
                StatsCounters::bump(&self.stats.failover_push_failures);
                warn!("failover push for {} failed: {}", id, err);
                false
            }
        };

        match store_result {
            Ok(()) => Ok(PassivationOutcome::Committed {
                generation,
                store_written: true,
                failover_pushed: pushed,
            }),
            Err(_) if pushed => Ok(PassivationOutcome::Committed {
                generation,
                store_written: false,
                failover_pushed: true,
            }),
            Err(err) => Err(err),
        }
    }

    fn push_to_failover(
        &self,
        cache: &dyn FailoverCache,
        id: &BeanId,
        bytes: Vec<u8>,
        last_access_time: i64,
    ) -> Result<()> {
        if cache.exists(id)? {
            trace!("updating failover entry for {}", id);
            cache.update(id, bytes, last_access_time)
        } else {
            trace!("creating failover entry for {}", id);
            cache.put(id, bytes, last_access_time)
        }
    }
}
