//! Named collection of particle layers of any kind

use super::kind::ParticleKind;
use super::layer::{ParticleLayer, ParticleLayerBase};
use crate::renderer::{RenderDevice, RenderParams, UniformProvider};

/// Owns particle layers and runs them in registration order
#[derive(Default)]
pub struct ParticleManager {
    layers: Vec<Box<dyn ParticleLayerBase>>,
}

impl ParticleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layer. Names are not required to be unique; lookups
    /// return the first match.
    pub fn add_layer<K: ParticleKind>(&mut self, layer: ParticleLayer<K>) {
        log::debug!("particle manager: added {} layer '{}'", K::NAME, layer.name());
        self.layers.push(Box::new(layer));
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> impl Iterator<Item = &dyn ParticleLayerBase> {
        self.layers.iter().map(|l| l.as_ref())
    }

    pub fn find_layer(&self, name: &str) -> Option<&dyn ParticleLayerBase> {
        self.layers
            .iter()
            .find(|l| l.name() == name)
            .map(|l| l.as_ref())
    }

    pub fn find_layer_by_tag(&self, tag: i32) -> Option<&dyn ParticleLayerBase> {
        self.layers
            .iter()
            .find(|l| l.tag() == tag)
            .map(|l| l.as_ref())
    }

    /// First layer called `name` whose kind is `K`
    pub fn find_typed_layer<K: ParticleKind>(&self, name: &str) -> Option<&ParticleLayer<K>> {
        self.layers
            .iter()
            .filter(|l| l.name() == name)
            .find_map(|l| l.as_any().downcast_ref::<ParticleLayer<K>>())
    }

    pub fn find_typed_layer_mut<K: ParticleKind>(
        &mut self,
        name: &str,
    ) -> Option<&mut ParticleLayer<K>> {
        self.layers
            .iter_mut()
            .filter(|l| l.name() == name)
            .find_map(|l| l.as_any_mut().downcast_mut::<ParticleLayer<K>>())
    }

    /// Remove the first layer called `name`, freeing its GPU buffer
    pub fn remove_layer(&mut self, name: &str, device: &mut dyn RenderDevice) -> bool {
        let Some(index) = self.layers.iter().position(|l| l.name() == name) else {
            return false;
        };
        let mut layer = self.layers.remove(index);
        layer.release_gpu_resources(device);
        true
    }

    pub fn tick(&mut self, delta_time: f32) {
        for layer in &mut self.layers {
            layer.tick(delta_time);
        }
    }

    /// Display every layer in registration order, returns the draw calls issued
    pub fn display(
        &mut self,
        device: &mut dyn RenderDevice,
        uniforms: &UniformProvider,
        params: &RenderParams,
    ) -> u32 {
        self.layers
            .iter_mut()
            .map(|layer| layer.display(device, uniforms, params))
            .sum()
    }

    /// Force-remove the allocations of every layer, keeping the layers
    pub fn clear_allocations(&mut self) {
        for layer in &mut self.layers {
            layer.clear_allocations();
        }
    }

    pub fn release_gpu_resources(&mut self, device: &mut dyn RenderDevice) {
        for layer in &mut self.layers {
            layer.release_gpu_resources(device);
        }
    }
}
