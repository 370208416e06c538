use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError, DefaultOnNull};

pub const PLACES_FIELD_MASK: &str = "displayName,googleMapsUri,rating,userRatingCount,reviews";
pub const REVIEWS_SOURCE: &str = "places_api_new";

/// Place Details as returned by the Places API (New). Every field is optional upstream and
/// a value of the wrong type is treated as if it were missing.
#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDetails {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub display_name: Option<LocalizedText>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub google_maps_uri: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub user_rating_count: Option<u64>,
    #[serde_as(as = "DefaultOnError<DefaultOnNull>")]
    #[serde(default)]
    pub reviews: Vec<PlaceReview>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceReview {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub author_attribution: Option<AuthorAttribution>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub text: Option<LocalizedText>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub relative_publish_time_description: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub publish_time: Option<String>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorAttribution {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub uri: Option<String>,
}

#[serde_as]
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalizedText {
    #[serde_as(as = "DefaultOnError")]
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewsPayload {
    pub ok: bool,
    pub source: String,
    pub place: PlaceSummary,
    pub summary: RatingSummary,
    pub reviews: Vec<NormalizedReview>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaceSummary {
    pub name: String,
    pub maps_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub rating: Option<f64>,
    pub review_count: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReview {
    pub author: String,
    pub author_url: String,
    pub rating: Option<f64>,
    pub text: String,
    pub relative_time: String,
    pub publish_time: String,
}

fn localized(text: Option<LocalizedText>) -> String {
    text.and_then(|t| t.text).unwrap_or_default()
}

impl From<PlaceReview> for NormalizedReview {
    fn from(review: PlaceReview) -> Self {
        let author = review.author_attribution.unwrap_or_default();

        Self {
            author: author.display_name.unwrap_or_default(),
            author_url: author.uri.unwrap_or_default(),
            rating: review.rating,
            text: localized(review.text),
            relative_time: review.relative_publish_time_description.unwrap_or_default(),
            publish_time: review.publish_time.unwrap_or_default(),
        }
    }
}

impl From<PlaceDetails> for ReviewsPayload {
    fn from(details: PlaceDetails) -> Self {
        Self {
            ok: true,
            source: REVIEWS_SOURCE.to_string(),
            place: PlaceSummary {
                name: localized(details.display_name),
                maps_url: details.google_maps_uri.unwrap_or_default(),
            },
            summary: RatingSummary {
                rating: details.rating,
                review_count: details.user_rating_count,
            },
            reviews: details.reviews.into_iter().map(NormalizedReview::from).collect(),
        }
    }
}
