use crate::truncate::limit_size;
use jamroom_protocol as proto;

/// Longest artist, song or album text shown before truncation kicks in.
pub const MAX_FIELD_LENGTH: usize = 45;

/// Widest album image we want as a row thumbnail.
pub const THUMBNAIL_WIDTH: u32 = 64;

/// One rendered search result.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRow {
    pub thumbnail: Option<String>,
    pub artists: String,
    pub song: String,
    pub album: String,
}

impl DisplayRow {
    pub fn from_track(track: &proto::Track) -> Self {
        let thumbnail =
            select_thumbnail(&track.album.images, THUMBNAIL_WIDTH).map(|image| image.url.clone());
        Self {
            thumbnail,
            artists: limit_size(&join_artists(&track.artists), MAX_FIELD_LENGTH),
            song: limit_size(&track.name, MAX_FIELD_LENGTH),
            album: limit_size(&track.album.name, MAX_FIELD_LENGTH),
        }
    }
}

pub fn join_artists(artists: &[proto::Artist]) -> String {
    artists
        .iter()
        .map(|artist| artist.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Rows in result order. No sorting, no dedup.
pub fn rows(response: &proto::SearchResponse) -> Vec<DisplayRow> {
    response
        .tracks
        .items
        .iter()
        .map(DisplayRow::from_track)
        .collect()
}

/// Pick the album image to use as a thumbnail.
///
/// Prefers the largest image no wider than `target_width`. If every image with
/// a known width is wider, takes the narrowest of them. When the API reports no
/// widths at all we fall back to the third image (the smallest in the usual
/// 640/300/64 ordering), or the last one if there are fewer.
pub fn select_thumbnail(images: &[proto::Image], target_width: u32) -> Option<&proto::Image> {
    let sized = images
        .iter()
        .filter_map(|image| image.width.map(|width| (width, image)));

    let fitting = sized
        .clone()
        .filter(|(width, _)| *width <= target_width)
        .max_by_key(|(width, _)| *width);
    if let Some((_, image)) = fitting {
        return Some(image);
    }
    if let Some((_, image)) = sized.min_by_key(|(width, _)| *width) {
        return Some(image);
    }
    images.get(2).or_else(|| images.last())
}
