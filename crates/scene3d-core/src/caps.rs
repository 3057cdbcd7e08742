//! Capability queries exposed by every context provider.

use std::collections::BTreeSet;
use std::fmt;

/// Rendering API behind a provider.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Api {
    OpenGl,
    Software,
}

/// `major.minor` OpenGL version.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
}

impl GlVersion {
    #[inline]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parses the leading `major.minor` of a `GL_VERSION` string such as
    /// `"4.6.0 NVIDIA 535.104"`. Missing or unparsable parts read as `0`.
    pub fn parse(version: &str) -> Self {
        let numeric = version.split_whitespace().next().unwrap_or("");
        let mut parts = numeric.split('.');
        let mut next = || {
            parts
                .next()
                .and_then(|p| {
                    let digits: String = p.chars().take_while(char::is_ascii_digit).collect();
                    digits.parse().ok()
                })
                .unwrap_or(0)
        };
        let major = next();
        let minor = next();
        Self { major, minor }
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// GLSL dialects the shader generator can target.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GlslVersion {
    Glsl120,
    Glsl140,
    Glsl330,
}

impl GlslVersion {
    pub fn directive(self) -> &'static str {
        match self {
            GlslVersion::Glsl120 => "#version 120",
            GlslVersion::Glsl140 => "#version 140",
            GlslVersion::Glsl330 => "#version 330",
        }
    }
}

/// Optional features a pass may fall back from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Feature {
    FramebufferBlit,
    FloatTextures,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::FramebufferBlit => f.write_str("framebuffer blit"),
            Feature::FloatTextures => f.write_str("floating-point textures"),
        }
    }
}

/// What a provider can do, queried once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    pub api: Api,
    pub version: GlVersion,
    pub glsl: Option<GlslVersion>,
    pub framebuffer_blit: bool,
    pub float_textures: bool,
    pub extensions: BTreeSet<String>,
}

impl Capabilities {
    /// Everything enabled; what the software provider reports by default.
    pub fn software() -> Self {
        Self {
            api: Api::Software,
            version: GlVersion::default(),
            glsl: None,
            framebuffer_blit: true,
            float_textures: true,
            extensions: BTreeSet::new(),
        }
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(name)
    }

    pub fn supports(&self, feature: Feature) -> bool {
        match feature {
            Feature::FramebufferBlit => self.framebuffer_blit,
            Feature::FloatTextures => self.float_textures,
        }
    }
}
