use crate::error::PvrError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use pvr_sync_models::MediaItem;
use serde::Deserialize;

/// Supported backend families. The arr servers share one REST dialect;
/// everything that differs between them lives in the [`Descriptor`] so a
/// single client implementation can drive all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    SonarrV3,
    SonarrV4,
    WhisparrV2,
    RadarrV5,
    LidarrV2,
    ReadarrV0,
}

impl Backend {
    pub fn from_tag(tag: &str) -> Result<Self, PvrError> {
        match tag.to_lowercase().as_str() {
            "sonarr_v3" => Ok(Backend::SonarrV3),
            "sonarr_v4" => Ok(Backend::SonarrV4),
            "whisparr_v2" => Ok(Backend::WhisparrV2),
            "radarr_v5" => Ok(Backend::RadarrV5),
            "lidarr_v2" => Ok(Backend::LidarrV2),
            "readarr_v0" => Ok(Backend::ReadarrV0),
            _ => Err(PvrError::UnknownBackend(tag.to_string())),
        }
    }

    /// Server family name, used in log and error messages.
    pub fn family(&self) -> &'static str {
        self.descriptor().family
    }

    pub fn descriptor(&self) -> &'static Descriptor {
        match self {
            Backend::SonarrV3 => &Descriptor {
                family: "sonarr",
                api_suffix: "/api/v3",
                expected_major: "3",
                search_command: "EpisodeSearch",
                ids_field: "episodeIds",
                listing: Listing::Paged {
                    sort_key: "airDateUtc",
                    shape: RecordShape::Episode,
                },
                queue_shape: QueueShape::TotalRecords,
            },
            Backend::SonarrV4 => &Descriptor {
                family: "sonarr",
                api_suffix: "/api/v3",
                expected_major: "4",
                search_command: "EpisodeSearch",
                ids_field: "episodeIds",
                listing: Listing::Paged {
                    sort_key: "airDateUtc",
                    shape: RecordShape::Episode,
                },
                queue_shape: QueueShape::TotalRecords,
            },
            // Whisparr speaks the Sonarr dialect but reports release dates
            // as bare yyyy-mm-dd strings.
            Backend::WhisparrV2 => &Descriptor {
                family: "whisparr",
                api_suffix: "/api/v3",
                expected_major: "2",
                search_command: "EpisodeSearch",
                ids_field: "episodeIds",
                listing: Listing::Paged {
                    sort_key: "airDateUtc",
                    shape: RecordShape::BareReleaseDate,
                },
                queue_shape: QueueShape::TotalRecords,
            },
            // Radarr has no wanted endpoints; the full movie collection is
            // fetched once and filtered client-side. Its queue endpoint
            // answers a bare array.
            Backend::RadarrV5 => &Descriptor {
                family: "radarr",
                api_suffix: "/api/v3",
                expected_major: "5",
                search_command: "moviesSearch",
                ids_field: "movieIds",
                listing: Listing::MovieCollection,
                queue_shape: QueueShape::BareArray,
            },
            Backend::LidarrV2 => &Descriptor {
                family: "lidarr",
                api_suffix: "/api/v1",
                expected_major: "2",
                search_command: "AlbumSearch",
                ids_field: "albumIds",
                listing: Listing::Paged {
                    sort_key: "airDateUtc",
                    shape: RecordShape::Release,
                },
                queue_shape: QueueShape::TotalRecords,
            },
            // Readarr's ids field really is capitalised on the server side.
            Backend::ReadarrV0 => &Descriptor {
                family: "readarr",
                api_suffix: "/api/v1",
                expected_major: "0",
                search_command: "BookSearch",
                ids_field: "BookIds",
                listing: Listing::Paged {
                    sort_key: "airDateUtc",
                    shape: RecordShape::Release,
                },
                queue_shape: QueueShape::TotalRecords,
            },
        }
    }
}

/// Everything that varies between backend families.
#[derive(Debug)]
pub struct Descriptor {
    pub family: &'static str,
    pub api_suffix: &'static str,
    /// Leading digit the server's reported version must match.
    pub expected_major: &'static str,
    pub search_command: &'static str,
    pub ids_field: &'static str,
    pub listing: Listing,
    pub queue_shape: QueueShape,
}

#[derive(Debug)]
pub enum Listing {
    /// `GET /wanted/missing` and `/wanted/cutoff`, offset-paginated.
    Paged {
        sort_key: &'static str,
        shape: RecordShape,
    },
    /// `GET /movie` in one request, eligibility computed client-side.
    MovieCollection,
}

#[derive(Debug, Clone, Copy)]
pub enum RecordShape {
    /// `airDateUtc` as a native timestamp (Sonarr episodes).
    Episode,
    /// `releaseDate` as a native timestamp (Lidarr albums, Readarr books).
    Release,
    /// `releaseDate` as a bare `yyyy-mm-dd` string (Whisparr).
    BareReleaseDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueShape {
    /// `{"totalRecords": n}`
    TotalRecords,
    /// A bare JSON array; the queue size is its length.
    BareArray,
}

fn zero_time() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

/// A record from a paginated wanted page, convertible to a [`MediaItem`].
pub trait WantedRecord: serde::de::DeserializeOwned {
    fn into_media_item(self) -> MediaItem;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub id: i64,
    #[serde(default)]
    pub air_date_utc: Option<DateTime<Utc>>,
}

impl WantedRecord for EpisodeRecord {
    fn into_media_item(self) -> MediaItem {
        MediaItem::new(self.id, self.air_date_utc.unwrap_or_else(zero_time))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRecord {
    pub id: i64,
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
}

impl WantedRecord for ReleaseRecord {
    fn into_media_item(self) -> MediaItem {
        MediaItem::new(self.id, self.release_date.unwrap_or_else(zero_time))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BareDateRecord {
    pub id: i64,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl WantedRecord for BareDateRecord {
    fn into_media_item(self) -> MediaItem {
        let air_date = self
            .release_date
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or_else(zero_time);
        MediaItem::new(self.id, air_date)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieRecord {
    pub id: i64,
    #[serde(default)]
    pub in_cinemas: Option<DateTime<Utc>>,
    #[serde(default)]
    pub digital_release: Option<DateTime<Utc>>,
    #[serde(default)]
    pub physical_release: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub movie_file: Option<MovieFileRecord>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieFileRecord {
    #[serde(default)]
    pub quality_cutoff_not_met: bool,
}

impl MovieRecord {
    /// Movies are wanted-missing only once actually released.
    pub fn is_missing(&self) -> bool {
        self.monitored && self.status == "released" && !self.has_file
    }

    pub fn is_cutoff_unmet(&self) -> bool {
        self.movie_file
            .as_ref()
            .map(|f| f.quality_cutoff_not_met)
            .unwrap_or(false)
    }

    /// The latest of the known release dates. Movies become obtainable at
    /// whichever release happened last, so the max wins.
    pub fn air_date(&self) -> DateTime<Utc> {
        [self.in_cinemas, self.digital_release, self.physical_release]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or_else(zero_time)
    }

    pub fn into_media_item(self) -> MediaItem {
        let air_date = self.air_date();
        MediaItem::new(self.id, air_date)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<R> {
    #[serde(default = "Vec::new")]
    pub records: Vec<R>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_backend_from_tag_is_case_insensitive() {
        assert_eq!(Backend::from_tag("Sonarr_V4").unwrap(), Backend::SonarrV4);
        assert_eq!(Backend::from_tag("radarr_v5").unwrap(), Backend::RadarrV5);
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = Backend::from_tag("medusa").unwrap_err();
        assert!(matches!(err, PvrError::UnknownBackend(ref tag) if tag == "medusa"));
    }

    #[test]
    fn test_descriptor_search_payload_fields() {
        let sonarr = Backend::SonarrV4.descriptor();
        assert_eq!(sonarr.search_command, "EpisodeSearch");
        assert_eq!(sonarr.ids_field, "episodeIds");

        let radarr = Backend::RadarrV5.descriptor();
        assert_eq!(radarr.search_command, "moviesSearch");
        assert_eq!(radarr.ids_field, "movieIds");

        let lidarr = Backend::LidarrV2.descriptor();
        assert_eq!(lidarr.api_suffix, "/api/v1");
        assert_eq!(lidarr.ids_field, "albumIds");

        // Readarr's capital B matches the server, not a typo.
        let readarr = Backend::ReadarrV0.descriptor();
        assert_eq!(readarr.ids_field, "BookIds");
    }

    #[test]
    fn test_bare_release_date_parsing() {
        let record = BareDateRecord {
            id: 7,
            release_date: Some("2024-03-01".to_string()),
        };
        let item = record.into_media_item();
        assert_eq!(
            item.air_date_utc,
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_bare_release_date_garbage_falls_back_to_zero() {
        let record = BareDateRecord {
            id: 7,
            release_date: Some("next tuesday".to_string()),
        };
        assert_eq!(record.into_media_item().air_date_utc, zero_time());
    }

    #[test]
    fn test_movie_air_date_takes_latest_release() {
        let movie = MovieRecord {
            id: 1,
            in_cinemas: Some(Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap()),
            digital_release: Some(Utc.with_ymd_and_hms(2023, 9, 15, 0, 0, 0).unwrap()),
            physical_release: Some(Utc.with_ymd_and_hms(2023, 8, 1, 0, 0, 0).unwrap()),
            status: "released".to_string(),
            monitored: true,
            has_file: false,
            movie_file: None,
        };
        assert_eq!(
            movie.air_date(),
            Utc.with_ymd_and_hms(2023, 9, 15, 0, 0, 0).unwrap()
        );
        // Idempotent: same input, same answer.
        assert_eq!(movie.air_date(), movie.air_date());
    }

    #[test]
    fn test_movie_air_date_with_no_dates_is_zero() {
        let movie = MovieRecord {
            id: 1,
            in_cinemas: None,
            digital_release: None,
            physical_release: None,
            status: "released".to_string(),
            monitored: true,
            has_file: false,
            movie_file: None,
        };
        assert_eq!(movie.air_date(), zero_time());
    }

    #[test]
    fn test_movie_eligibility() {
        let mut movie = MovieRecord {
            id: 1,
            in_cinemas: None,
            digital_release: None,
            physical_release: None,
            status: "released".to_string(),
            monitored: true,
            has_file: false,
            movie_file: None,
        };
        assert!(movie.is_missing());

        movie.monitored = false;
        assert!(!movie.is_missing());

        movie.monitored = true;
        movie.has_file = true;
        assert!(!movie.is_missing());

        movie.status = "announced".to_string();
        movie.has_file = false;
        assert!(!movie.is_missing());

        assert!(!movie.is_cutoff_unmet());
        movie.movie_file = Some(MovieFileRecord {
            quality_cutoff_not_met: true,
        });
        assert!(movie.is_cutoff_unmet());
    }
}
