use crate::model::{Category, Track, TrackId};
use crate::naming::display_name;

const STREAM_BASE: &str = "https://sleepsounds-demo.bose.com/audio/";

/// Category names in menu order, each with the file names it streams.
const BUILTIN: &[(&str, &[&str])] = &[
    (
        "Naturescapes",
        &[
            "bosexx_nscp_Alpine-Powder.mp3",
            "bosexx_nscp_Country-Road.mp3",
            "bosexx_nscp_HideAway.mp3",
            "bosexx_nscp_Marina.mp3",
            "bosexx_nscp_Portal.mp3",
            "bosexx_nscp_Rainforest.mp3",
            "bosexx_nscp_Shoreline.mp3",
            "bosexx_nscp_Songbird_1.mp3",
            "bosexx_nscp_Squall.mp3",
            "bosexx_nscp_Tumble-Dry.mp3",
            "bosexx_nscp_Tundra.mp3",
            "bosexx_nscp_Windswept.mp3",
            "bosexx_nscp-canvas-rain.mp3",
            "bosexx_nscp-island-hop.mp3",
            "bosexx_nscp-railway.mp3",
            "bosexx_nscp-simmer.mp3",
            "SBII_Sound_nscp-Boardwalk.mp3",
            "SBII_Sound_nscp-Outbound.mp3",
            "SBII_Sound_nscp-Starboard.mp3",
            "SBII_Sound_nscp-Windowseat.mp3",
        ],
    ),
    (
        "Noise Masking",
        &[
            "bosexx_msk_Altitude.mp3",
            "bosexx_msk_campfire.mp3",
            "bosexx_msk_Cascade_Waterfall.mp3",
            "bosexx_msk_Circulate-Dehumidifier.mp3",
            "bosexx_msk_Crosswind.mp3",
            "bosexx_msk_Downstream.mp3",
            "bosexx_msk_Elements.mp3",
            "bosexx_msk_Frost.mp3",
            "bosexx_msk_Mist.mp3",
            "bosexx_msk_Rumble.mp3",
            "bosexx_msk_Sand.mp3",
            "bosexx_msk_Shower.mp3",
            "bosexx_msk_Undercurrent.mp3",
            "bosexx_msk_WhiteOut.mp3",
            "bosexx_msk-engine-room.mp3",
            "SBII_Sound_msk-Rinse.mp3",
            "SBII_Sound_msk-Rustle.mp3",
            "SBII_Sound_msk-Swell_Ocean.mp3",
            "SBII_Sound_msk-Warm_Static.mp3",
        ],
    ),
    (
        "Tranquilities",
        &[
            "bosexx_trn_Afterglow.mp3",
            "bosexx_trn_Ambient.mp3",
            "bosexx_trn_Calm.mp3",
            "bosexx_trn_Candlelight.mp3",
            "bosexx_trn_Chill.mp3",
            "bosexx_trn_Cozy.mp3",
            "bosexx_trn_Dreamscape.mp3",
            "bosexx_trn_Ethereal.mp3",
            "bosexx_trn_Harmony.mp3",
            "bosexx_trn_Lullaby.mp3",
            "bosexx_trn_Meditation.mp3",
            "bosexx_trn_Peaceful.mp3",
            "bosexx_trn_Relaxation.mp3",
            "bosexx_trn_Serenity.mp3",
            "bosexx_trn_Sleep.mp3",
            "bosexx_trn_Snooze.mp3",
            "bosexx_trn_Tranquil.mp3",
            "bosexx_trn_Zen.mp3",
        ],
    ),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    categories: Vec<Category>,
}

impl Catalog {
    /// The fixed sound catalog shipped with the app.
    pub fn builtin() -> Self {
        Self::from_urls(BUILTIN.iter().map(|(name, files)| {
            (
                *name,
                files
                    .iter()
                    .map(|file| format!("{STREAM_BASE}{file}"))
                    .collect::<Vec<_>>(),
            )
        }))
    }

    pub fn from_urls<N, U>(categories: impl IntoIterator<Item = (N, Vec<U>)>) -> Self
    where
        N: Into<String>,
        U: AsRef<str>,
    {
        let categories = categories
            .into_iter()
            .map(|(name, urls)| Category {
                name: name.into(),
                tracks: urls
                    .iter()
                    .map(|url| Track {
                        id: TrackId::new(url.as_ref()),
                        display_name: display_name(url.as_ref()),
                    })
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn find(&self, id: &TrackId) -> Option<&Track> {
        self.tracks().find(|track| &track.id == id)
    }

    pub fn contains(&self, id: &TrackId) -> bool {
        self.find(id).is_some()
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.categories
            .iter()
            .flat_map(|category| category.tracks.iter())
    }

    pub fn len(&self) -> usize {
        self.tracks().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
