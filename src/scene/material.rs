//! Material table entries (`MATD`).

/// Number of texture slots (`TX0D`..`TX3D`).
pub const TEXTURE_SLOTS: usize = 4;

/// `ATRB` flag bits.
pub mod flags {
    pub const EMISSIVE: u8 = 1;
    pub const GLOW: u8 = 2;
    pub const TRANSPARENT: u8 = 4;
    pub const DOUBLE_SIDED: u8 = 8;
    pub const HARD_EDGED: u8 = 16;
    pub const PER_PIXEL: u8 = 32;
    pub const ADDITIVE: u8 = 64;
    pub const SPECULAR: u8 = 128;
}

/// A material definition.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name, referenced by geometry segments.
    pub name: String,
    /// Diffuse colour. Carried for round-trips, the game ignores it.
    pub diffuse_color: [f32; 4],
    /// Specular colour.
    pub specular_color: [f32; 4],
    /// Ambient colour. Carried for round-trips, the game ignores it.
    pub ambient_color: [f32; 4],
    /// Specular exponent.
    pub specular_exponent: f32,
    /// `ATRB` flag bits, see [`flags`].
    pub flags: u8,
    /// Render type.
    pub rendertype: u8,
    /// Render type parameters.
    pub data: [u8; 2],
    /// Texture paths for slots 0..3.
    pub textures: [Option<String>; TEXTURE_SLOTS],
}

impl Material {
    /// Create a material with default colours and no textures.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Check an `ATRB` flag bit.
    #[inline]
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Primary texture path, if any.
    pub fn texture0(&self) -> Option<&str> {
        self.textures[0].as_deref()
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: [1.0; 4],
            specular_color: [1.0; 4],
            ambient_color: [0.0, 0.0, 0.0, 1.0],
            specular_exponent: 50.0,
            flags: 0,
            rendertype: 0,
            data: [0; 2],
            textures: Default::default(),
        }
    }
}
