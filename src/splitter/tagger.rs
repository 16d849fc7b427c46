use std::path::Path;

use id3::{Tag, TagLike, Timestamp, Version};

use super::error::SplitError;
use super::planner::TagSet;

/// Writes a chapter's tag set into an output file.
pub trait Tagger {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), SplitError>;
}

/// ID3v2.4 tagger. Any tag the file already carries is replaced; the audio
/// frames are left untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct Id3Tagger;

impl Tagger for Id3Tagger {
    fn write_tags(&self, path: &Path, tags: &TagSet) -> Result<(), SplitError> {
        let tag = build_tag(tags);
        tag.write_to_path(path, Version::Id3v24)
            .map_err(|e| SplitError::Tagging {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }
}

fn build_tag(tags: &TagSet) -> Tag {
    let mut tag = Tag::new();
    tag.set_title(tags.title.as_str());
    tag.set_album(tags.album.as_str());
    tag.set_artist(tags.artist.as_str());
    tag.set_album_artist(tags.artist.as_str());

    // TRCK keeps the "n/total" form
    tag.set_text("TRCK", tags.track.as_str());

    if let Some(year) = tags.year.as_deref().and_then(|y| y.parse::<i32>().ok()) {
        tag.set_date_recorded(Timestamp {
            year,
            month: None,
            day: None,
            hour: None,
            minute: None,
            second: None,
        });
    }
    if let Some(genre) = &tags.genre {
        tag.set_genre(genre.as_str());
    }
    tag
}
