//! Native stylesheet bindings for the XML sources
//!
//! The core crate normalizes XML sources through an opaque transform into
//! canonical collection XML. These are the concrete transforms the CLI
//! binds in: one per source, each reducing the service's document to the
//! canonical shape the importer expects.

use curio_fetch_core::error::{FetchError, Result};
use curio_fetch_core::transform::XsltPipeline;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

/// MusicBrainz release-list into a canonical music collection
pub struct MusicBrainzStylesheet;

#[derive(Default)]
struct Release {
    title: String,
    artists: Vec<String>,
    year: String,
}

impl XsltPipeline for MusicBrainzStylesheet {
    fn transform(&self, source_xml: &str) -> Result<String> {
        let mut reader = Reader::from_str(source_xml);
        reader.config_mut().trim_text(true);

        let mut releases = Vec::new();
        let mut current: Option<Release> = None;
        let mut in_artist = false;
        let mut element = String::new();

        loop {
            match reader.read_event().map_err(payload)? {
                Event::Start(start) => match start.local_name().as_ref() {
                    b"release" => current = Some(Release::default()),
                    b"artist" => in_artist = true,
                    other => element = String::from_utf8_lossy(other).into_owned(),
                },
                Event::Text(text) => {
                    if let Some(release) = current.as_mut() {
                        let value = text.unescape().map_err(payload)?.into_owned();
                        match element.as_str() {
                            "title" if !in_artist => release.title = value,
                            "name" if in_artist => release.artists.push(value),
                            "date" if !in_artist => {
                                release.year = value.chars().take(4).collect();
                            }
                            _ => {}
                        }
                    }
                }
                Event::End(end) => match end.local_name().as_ref() {
                    b"release" => {
                        if let Some(release) = current.take() {
                            releases.push(release);
                        }
                    }
                    b"artist" => in_artist = false,
                    _ => element.clear(),
                },
                Event::Eof => break,
                _ => {}
            }
        }

        let mut xml = String::from("<collection type=\"music\">\n");
        for release in releases {
            xml.push_str("  <entry>\n");
            push_element(&mut xml, "title", &release.title);
            for artist in &release.artists {
                push_element(&mut xml, "artist", artist);
            }
            push_element(&mut xml, "year", &release.year);
            xml.push_str("  </entry>\n");
        }
        xml.push_str("</collection>");
        Ok(xml)
    }
}

/// BoardGameGeek thing items into a canonical board game collection
pub struct BoardGameGeekStylesheet;

#[derive(Default)]
struct BoardGame {
    title: String,
    year: String,
    max_players: String,
    playing_time: String,
    designers: Vec<String>,
    publishers: Vec<String>,
}

impl XsltPipeline for BoardGameGeekStylesheet {
    fn transform(&self, source_xml: &str) -> Result<String> {
        let mut reader = Reader::from_str(source_xml);
        reader.config_mut().trim_text(true);

        let mut games = Vec::new();
        let mut current: Option<BoardGame> = None;

        loop {
            match reader.read_event().map_err(payload)? {
                Event::Start(start) => {
                    if start.local_name().as_ref() == b"item" {
                        current = Some(BoardGame::default());
                    } else if let Some(game) = current.as_mut() {
                        apply_item_child(game, &start)?;
                    }
                }
                Event::Empty(start) => {
                    if let Some(game) = current.as_mut() {
                        apply_item_child(game, &start)?;
                    }
                }
                Event::End(end) => {
                    if end.local_name().as_ref() == b"item" {
                        if let Some(game) = current.take() {
                            games.push(game);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let mut xml = String::from("<collection type=\"boardgame\">\n");
        for game in games {
            xml.push_str("  <entry>\n");
            push_element(&mut xml, "title", &game.title);
            push_element(&mut xml, "year", &game.year);
            for designer in &game.designers {
                push_element(&mut xml, "designer", designer);
            }
            for publisher in &game.publishers {
                push_element(&mut xml, "publisher", publisher);
            }
            push_element(&mut xml, "num-player", &game.max_players);
            push_element(&mut xml, "playing-time", &game.playing_time);
            xml.push_str("  </entry>\n");
        }
        xml.push_str("</collection>");
        Ok(xml)
    }
}

fn apply_item_child(game: &mut BoardGame, start: &BytesStart<'_>) -> Result<()> {
    match start.local_name().as_ref() {
        b"name" => {
            if attr(start, "type")?.as_deref() == Some("primary") {
                game.title = attr(start, "value")?.unwrap_or_default();
            }
        }
        b"yearpublished" => game.year = attr(start, "value")?.unwrap_or_default(),
        b"maxplayers" => game.max_players = attr(start, "value")?.unwrap_or_default(),
        b"playingtime" => game.playing_time = attr(start, "value")?.unwrap_or_default(),
        b"link" => {
            let kind = attr(start, "type")?.unwrap_or_default();
            let value = attr(start, "value")?.unwrap_or_default();
            if value.is_empty() {
                return Ok(());
            }
            match kind.as_str() {
                "boardgamedesigner" => game.designers.push(value),
                "boardgamepublisher" => game.publishers.push(value),
                _ => {}
            }
        }
        _ => {}
    }
    Ok(())
}

fn attr(start: &BytesStart<'_>, key: &str) -> Result<Option<String>> {
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| FetchError::payload(e.to_string()))?;
        if attribute.key.as_ref() == key.as_bytes() {
            let value = attribute.unescape_value().map_err(payload)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn push_element(xml: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    xml.push_str(&format!("    <{name}>{}</{name}>\n", escape(value)));
}

fn payload(err: quick_xml::Error) -> FetchError {
    FetchError::payload(err.to_string())
}
