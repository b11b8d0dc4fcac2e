//! Typed texture handles and the host-side texture arena.
//!
//! A stage never receives a raw buffer. It gets [`Read`] views of its inputs
//! and [`Write`] views of its outputs, and a device refuses any dispatch that
//! binds one texture both ways.

use std::fmt;
use std::marker::PhantomData;

use bytemuck::Pod;

use crate::error::{OceanError, Result};

/// Texel layout of a texture
pub trait TexelFormat: Send + Sync + 'static {
    type Texel: Pod + Send + Sync + fmt::Debug;

    /// Number of f32 components per texel
    const COMPONENTS: usize;
    const NAME: &'static str;
}

/// Two f32 components (re, im)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rg32F;

impl TexelFormat for Rg32F {
    type Texel = [f32; 2];
    const COMPONENTS: usize = 2;
    const NAME: &'static str = "RG32F";
}

/// Four f32 components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba32F;

impl TexelFormat for Rgba32F {
    type Texel = [f32; 4];
    const COMPONENTS: usize = 4;
    const NAME: &'static str = "RGBA32F";
}

/// Handle to a device texture of format `F`
pub struct Handle<F: TexelFormat> {
    id: usize,
    width: u32,
    height: u32,
    _format: PhantomData<F>,
}

impl<F: TexelFormat> Handle<F> {
    pub(crate) fn new(id: usize, width: u32, height: u32) -> Self {
        Self {
            id,
            width,
            height,
            _format: PhantomData,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Read-only view for one dispatch
    pub fn read(&self) -> Read<F> {
        Read(*self)
    }

    /// Write-only view for one dispatch
    pub fn write(&self) -> Write<F> {
        Write(*self)
    }

    /// Fails unless the texture is `width` × `height`
    pub fn ensure_extent(&self, width: u32, height: u32) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(OceanError::GridMismatch {
                expected: width as usize * height as usize,
                actual: self.texel_count(),
            });
        }
        Ok(())
    }
}

impl<F: TexelFormat> Clone for Handle<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: TexelFormat> Copy for Handle<F> {}

impl<F: TexelFormat> PartialEq for Handle<F> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<F: TexelFormat> Eq for Handle<F> {}

impl<F: TexelFormat> fmt::Debug for Handle<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}({}x{})", F::NAME, self.id, self.width, self.height)
    }
}

/// Read-only binding of a texture
#[derive(Debug)]
pub struct Read<F: TexelFormat>(pub Handle<F>);

/// Write-only binding of a texture
#[derive(Debug)]
pub struct Write<F: TexelFormat>(pub Handle<F>);

impl<F: TexelFormat> Clone for Read<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: TexelFormat> Copy for Read<F> {}

impl<F: TexelFormat> Clone for Write<F> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<F: TexelFormat> Copy for Write<F> {}

/// Fails if a written texture is also read, or written twice, in one dispatch
pub fn check_bindings(reads: &[usize], writes: &[usize]) -> Result<()> {
    for (i, write) in writes.iter().enumerate() {
        if reads.contains(write) {
            return Err(OceanError::ResourceConflict(format!(
                "texture {write} is bound for reading and writing"
            )));
        }
        if writes[i + 1..].contains(write) {
            return Err(OceanError::ResourceConflict(format!(
                "texture {write} is bound for writing twice"
            )));
        }
    }
    Ok(())
}

/// Host memory backing for textures, addressed by handle id
#[derive(Debug, Default)]
pub struct HostArena {
    textures: Vec<Vec<f32>>,
}

impl HostArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zero-filled texture
    pub fn create<F: TexelFormat>(&mut self, width: u32, height: u32) -> Handle<F> {
        let id = self.textures.len();
        let len = width as usize * height as usize * F::COMPONENTS;
        self.textures.push(vec![0.0; len]);
        Handle::new(id, width, height)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    fn storage(&self, id: usize) -> Result<&[f32]> {
        self.textures
            .get(id)
            .map(Vec::as_slice)
            .ok_or(OceanError::UnknownResource(id))
    }

    /// Texels of a texture bound for reading
    pub fn view<F: TexelFormat>(&self, binding: Read<F>) -> Result<&[F::Texel]> {
        let data = self.storage(binding.0.id)?;
        Ok(bytemuck::cast_slice(data))
    }

    /// Move the storage of written textures out of the arena for one dispatch
    pub fn take(&mut self, id: usize) -> Result<Vec<f32>> {
        let data = self
            .textures
            .get_mut(id)
            .ok_or(OceanError::UnknownResource(id))?;
        Ok(std::mem::take(data))
    }

    /// Return storage moved out by [`HostArena::take`]
    pub fn restore(&mut self, id: usize, data: Vec<f32>) -> Result<()> {
        let slot = self
            .textures
            .get_mut(id)
            .ok_or(OceanError::UnknownResource(id))?;
        *slot = data;
        Ok(())
    }

    /// Overwrite a texture with `texels`
    pub fn upload<F: TexelFormat>(
        &mut self,
        binding: Write<F>,
        texels: &[F::Texel],
    ) -> Result<()> {
        let id = binding.0.id;
        let slot = self
            .textures
            .get_mut(id)
            .ok_or(OceanError::UnknownResource(id))?;
        let source: &[f32] = bytemuck::cast_slice(texels);
        if source.len() != slot.len() {
            return Err(OceanError::GridMismatch {
                expected: slot.len() / F::COMPONENTS,
                actual: texels.len(),
            });
        }
        slot.copy_from_slice(source);
        Ok(())
    }
}
