//! Presentation options applied to the generated model.
//!
//! Three independent groups (ethnicity, vibe, scene), each a closed set with
//! exactly one value selected at all times.

use crate::error::{Result, TryOnError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A closed, single-choice option group.
pub trait OptionGroup: Copy + Eq + fmt::Display + 'static {
    /// Heading shown above the group.
    const TITLE: &'static str;

    /// Every variant, in display order. The first is the default.
    fn variants() -> &'static [Self];

    /// Stable identifier used on the command line and in JSON.
    fn as_str(&self) -> &'static str;

    /// Human-readable label.
    fn label(&self) -> &'static str;

    /// Text woven into the generation prompt.
    fn prompt_fragment(&self) -> &'static str;

    /// Looks a variant up by identifier or label, ignoring case.
    fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        Self::variants().iter().copied().find(|v| {
            v.as_str().eq_ignore_ascii_case(input) || v.label().eq_ignore_ascii_case(input)
        })
    }
}

macro_rules! option_group {
    (
        $(#[$meta:meta])*
        $name:ident, $title:literal {
            $( $(#[$vmeta:meta])* $variant:ident => ($id:literal, $label:literal, $fragment:literal), )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum $name {
            $(
                #[doc = $label]
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in display order.
            pub const ALL: &'static [$name] = &[$( $name::$variant, )+];
        }

        impl OptionGroup for $name {
            const TITLE: &'static str = $title;

            fn variants() -> &'static [Self] {
                Self::ALL
            }

            fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $id, )+
                }
            }

            fn label(&self) -> &'static str {
                match self {
                    $( Self::$variant => $label, )+
                }
            }

            fn prompt_fragment(&self) -> &'static str {
                match self {
                    $( Self::$variant => $fragment, )+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl FromStr for $name {
            type Err = TryOnError;

            fn from_str(s: &str) -> Result<Self> {
                <Self as OptionGroup>::parse(s).ok_or_else(|| {
                    TryOnError::InvalidRequest(format!(
                        "unknown {} '{}'",
                        stringify!($name).to_lowercase(),
                        s.trim()
                    ))
                })
            }
        }
    };
}

option_group! {
    /// Ethnicity of the generated model.
    Ethnicity, "Model ethnicity" {
        #[default]
        Asian => ("asian", "Asian", "an East Asian"),
        Caucasian => ("caucasian", "Caucasian", "a Caucasian"),
        Black => ("black", "Black", "a Black"),
        Latino => ("latino", "Latino", "a Latino"),
        MiddleEastern => ("middle-eastern", "Middle Eastern", "a Middle Eastern"),
    }
}

option_group! {
    /// Personality and styling of the generated model.
    Vibe, "Style vibe" {
        #[default]
        Cool => ("cool", "Cool & commanding", "cool, confident and commanding"),
        Energetic => ("energetic", "Lively & sunny", "lively, cheerful and energetic"),
        Elegant => ("elegant", "Elegant", "elegant and graceful"),
        Casual => ("casual", "Relaxed casual", "relaxed and effortlessly casual"),
        Professional => ("professional", "Sharp professional", "sharp, polished and professional"),
        Vintage => ("vintage", "Retro artsy", "retro, artsy and vintage-inspired"),
    }
}

option_group! {
    /// Background scene of the generated photo.
    Scene, "Photo scene" {
        #[default]
        Studio => ("studio", "Minimal studio", "a minimalist photo studio with a seamless solid-color backdrop"),
        Street => ("street", "City street", "a bustling city street"),
        Nature => ("nature", "Sunlit park", "a park with warm sunlight filtering through the trees"),
        Cafe => ("cafe", "Stylish cafe", "a stylish, well-designed cafe interior"),
        Beach => ("beach", "Sunset beach", "a beach at sunset"),
        Future => ("future", "Cyberpunk future", "a neon-lit cyberpunk cityscape of the future"),
    }
}

/// One snapshot of the three option groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Selected ethnicity.
    pub ethnicity: Ethnicity,
    /// Selected vibe.
    pub vibe: Vibe,
    /// Selected scene.
    pub scene: Scene,
}

impl GenerationOptions {
    /// Creates options from explicit selections.
    pub fn new(ethnicity: Ethnicity, vibe: Vibe, scene: Scene) -> Self {
        Self {
            ethnicity,
            vibe,
            scene,
        }
    }

    /// Selects an ethnicity.
    pub fn set_ethnicity(&mut self, ethnicity: Ethnicity) {
        self.ethnicity = ethnicity;
    }

    /// Selects a vibe.
    pub fn set_vibe(&mut self, vibe: Vibe) {
        self.vibe = vibe;
    }

    /// Selects a scene.
    pub fn set_scene(&mut self, scene: Scene) {
        self.scene = scene;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_counts() {
        assert_eq!(Ethnicity::ALL.len(), 5);
        assert_eq!(Vibe::ALL.len(), 6);
        assert_eq!(Scene::ALL.len(), 6);
    }

    #[test]
    fn test_defaults_are_first_variants() {
        let options = GenerationOptions::default();
        assert_eq!(options.ethnicity, Ethnicity::ALL[0]);
        assert_eq!(options.vibe, Vibe::ALL[0]);
        assert_eq!(options.scene, Scene::ALL[0]);
    }

    #[test]
    fn test_setters_leave_other_groups_alone() {
        let mut options = GenerationOptions::default();
        for &vibe in Vibe::ALL {
            options.set_vibe(vibe);
            assert_eq!(options.vibe, vibe);
            assert_eq!(options.ethnicity, Ethnicity::Asian);
            assert_eq!(options.scene, Scene::Studio);
        }

        options.set_scene(Scene::Beach);
        options.set_ethnicity(Ethnicity::Latino);
        assert_eq!(
            options,
            GenerationOptions::new(Ethnicity::Latino, Vibe::Vintage, Scene::Beach)
        );
    }

    #[test]
    fn test_parse_by_id_and_label() {
        assert_eq!("middle-eastern".parse::<Ethnicity>().unwrap(), Ethnicity::MiddleEastern);
        assert_eq!("Middle Eastern".parse::<Ethnicity>().unwrap(), Ethnicity::MiddleEastern);
        assert_eq!(" CAFE ".parse::<Scene>().unwrap(), Scene::Cafe);
        assert!("disco".parse::<Vibe>().is_err());
    }

    #[test]
    fn test_identifiers_are_unique() {
        fn check<T: OptionGroup>() {
            let mut ids: Vec<_> = T::variants().iter().map(|v| v.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), T::variants().len(), "{}", T::TITLE);
            // Labels double as the variant docs.
            assert!(T::variants().iter().all(|v| !v.label().trim().is_empty()));
        }
        check::<Ethnicity>();
        check::<Vibe>();
        check::<Scene>();
    }

    #[test]
    fn test_serde_uses_kebab_case() {
        let options = GenerationOptions::new(Ethnicity::MiddleEastern, Vibe::Cool, Scene::Future);
        let json = serde_json::to_value(options).unwrap();
        assert_eq!(json["ethnicity"], "middle-eastern");
        assert_eq!(json["scene"], "future");
    }
}
