use super::collaborators::IdentityGuard;
use super::instance::StatefulInstance;
use super::stats::StatsCounters;
use super::{StatefulPassivator, advance};
use crate::capture::restore_object;
use crate::codec::{FrameGeneration, PassivationFrame, decode_frame, decompress};
use crate::core::{BeanId, BeanMetaData, OperationKind, PassivationError, Result};
use log::{debug, trace, warn};
use std::io::{Cursor, Read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Idle,
    Locating,
    Decoding,
    Restoring,
    Completed,
    Failed,
}

/// Where an activated frame was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationSource {
    FailoverCache,
    DurableStore,
}

impl StatefulPassivator {
    pub fn activate(&self, id: &BeanId, bean: &BeanMetaData) -> Result<StatefulInstance> {
        self.activate_with_hint(id, bean, None)
    }

    /// Rebuilds the instance passivated under `id` and deletes its store
    /// entry. `client_hint` is handed to the failover cache.
    ///
    /// The failover cache is consulted before the durable store. No partial
    /// instance is returned on failure.
    pub fn activate_with_hint(
        &self,
        id: &BeanId,
        bean: &BeanMetaData,
        client_hint: Option<&str>,
    ) -> Result<StatefulInstance> {
        let result = IdentityGuard::push(self.identity.clone(), bean).and_then(|_identity| {
            let _lock = self.locks.activate()?;
            self.run_activation(id, bean, client_hint)
        });

        match result {
            Ok((instance, source)) => {
                StatsCounters::bump(&self.stats.activations);
                match source {
                    ActivationSource::FailoverCache => {
                        StatsCounters::bump(&self.stats.failover_activations)
                    }
                    ActivationSource::DurableStore => {
                        StatsCounters::bump(&self.stats.store_activations)
                    }
                }
                debug!("activated {} ({}) from {:?}", id, bean.name, source);
                Ok(instance)
            }
            Err(err) => {
                StatsCounters::bump(&self.stats.activation_failures);
                Err(err.in_operation(OperationKind::Activate, id))
            }
        }
    }

    fn run_activation(
        &self,
        id: &BeanId,
        bean: &BeanMetaData,
        client_hint: Option<&str>,
    ) -> Result<(StatefulInstance, ActivationSource)> {
        let mut state = ActivationState::Idle;

        let outcome = self.locate_and_restore(id, bean, client_hint, &mut state);
        match outcome {
            Ok(activated) => {
                advance(id, &mut state, ActivationState::Completed);
                // The instance lives in memory again; the stored copy is stale.
                self.discard_entry(id, "activated");
                Ok(activated)
            }
            Err(err) => {
                advance(id, &mut state, ActivationState::Failed);
                Err(err)
            }
        }
    }

    fn locate_and_restore(
        &self,
        id: &BeanId,
        bean: &BeanMetaData,
        client_hint: Option<&str>,
        state: &mut ActivationState,
    ) -> Result<(StatefulInstance, ActivationSource)> {
        let generation = self.generation_for(bean);

        advance(id, state, ActivationState::Locating);
        let (mut reader, source) = self
            .locate(id, client_hint)?
            .ok_or_else(|| PassivationError::NotFound(id.clone()))?;

        let restored = self.decode_and_restore(id, bean, &mut reader, generation, state);
        drop(reader);
        if let (Err(err), ActivationSource::FailoverCache) = (&restored, source) {
            warn!("failover frame for {} was consumed by a failed activation: {}", id, err);
        }
        restored.map(|instance| (instance, source))
    }

    fn decode_and_restore(
        &self,
        id: &BeanId,
        bean: &BeanMetaData,
        reader: &mut Box<dyn Read + Send>,
        generation: FrameGeneration,
        state: &mut ActivationState,
    ) -> Result<StatefulInstance> {
        advance(id, state, ActivationState::Decoding);
        let frame = decode_frame(reader, generation, bean)?;

        advance(id, state, ActivationState::Restoring);
        self.restore_frame(id, bean, frame)
    }

    /// Opens a decompressed reader on the frame for `id`, if any.
    fn locate(
        &self,
        id: &BeanId,
        client_hint: Option<&str>,
    ) -> Result<Option<(Box<dyn Read + Send>, ActivationSource)>> {
        let Some(cache) = &self.failover else {
            let reader = self.store.open_decompressed_reader(id)?;
            return Ok(reader.map(|reader| {
                let reader: Box<dyn Read + Send> = Box::new(reader);
                (reader, ActivationSource::DurableStore)
            }));
        };

        if cache.exists(id)? {
            if cache.in_sticky_unit_of_work(id)? {
                return Err(PassivationError::StickyFailoverUnsupported(id.clone()));
            }
            if let Some(compressed) = cache.get_and_remove(id, client_hint)? {
                trace!("frame for {} taken from failover cache", id);
                let bytes = decompress(&compressed).inspect_err(|err| {
                    warn!("failover frame for {} could not be decompressed: {}", id, err)
                })?;
                let reader: Box<dyn Read + Send> = Box::new(Cursor::new(bytes));
                return Ok(Some((reader, ActivationSource::FailoverCache)));
            }
        }

        match self.store.read_bytes(id)? {
            Some(compressed) => {
                trace!("frame for {} read from durable store", id);
                let reader: Box<dyn Read + Send> = Box::new(Cursor::new(decompress(&compressed)?));
                Ok(Some((reader, ActivationSource::DurableStore)))
            }
            None => Ok(None),
        }
    }

    /// Applies the access time first, then the binding, the managed context
    /// and the interceptor chain.
    fn restore_frame(
        &self,
        id: &BeanId,
        bean: &BeanMetaData,
        frame: PassivationFrame,
    ) -> Result<StatefulInstance> {
        let PassivationFrame {
            last_access_time,
            persistence_context,
            primary,
            managed_context,
            interceptors,
        } = frame;

        let object = restore_object(&self.registry, primary, &bean.type_name)?;
        let mut instance = StatefulInstance::from_boxed(id.clone(), object);
        instance.set_last_access_time(last_access_time);
        instance.set_persistence_context(persistence_context);

        self.managed_context
            .read_context(id, last_access_time, &managed_context)?;

        if let Some(records) = interceptors {
            let mut restored = Vec::with_capacity(records.len());
            for (record, expected_type) in records.into_iter().zip(&bean.interceptor_types) {
                restored.push(restore_object(&self.registry, record, expected_type)?);
            }
            instance = instance.with_interceptors(restored);
        }

        Ok(instance)
    }
}
