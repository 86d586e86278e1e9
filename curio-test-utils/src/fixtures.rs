//! Canned service payloads for fetcher tests
//!
//! Trimmed to the fields the fetchers actually read, but shaped exactly
//! like the real services' responses.

/// TVmaze `/search/shows?q=firefly`
pub const TVMAZE_SEARCH_FIREFLY: &str = r#"[
  {
    "score": 0.91,
    "show": {
      "id": 180,
      "name": "Firefly",
      "language": "English",
      "genres": ["Drama", "Adventure", "Science-Fiction"],
      "premiered": "2002-09-20",
      "network": {"id": 4, "name": "FOX"},
      "image": {
        "medium": "https://static.tvmaze.com/uploads/images/medium_portrait/4/11260.jpg",
        "original": "https://static.tvmaze.com/uploads/images/original_untouched/4/11260.jpg"
      },
      "summary": "<p>Captain Malcolm 'Mal' Reynolds is a former galaxy war veteran who is the captain of the transport ship <b>Serenity</b>.</p>"
    }
  }
]"#;

/// TVmaze `/shows/180?embed[]=cast&embed[]=crew`
pub const TVMAZE_SHOW_FIREFLY: &str = r#"{
  "id": 180,
  "name": "Firefly",
  "language": "English",
  "genres": ["Drama", "Adventure", "Science-Fiction"],
  "premiered": "2002-09-20",
  "network": {"id": 4, "name": "FOX"},
  "image": {
    "medium": "https://static.tvmaze.com/uploads/images/medium_portrait/4/11260.jpg",
    "original": "https://static.tvmaze.com/uploads/images/original_untouched/4/11260.jpg"
  },
  "summary": "<p>Captain Malcolm 'Mal' Reynolds is a former galaxy war veteran who is the captain of the transport ship <b>Serenity</b>.</p>",
  "_embedded": {
    "cast": [
      {"person": {"name": "Nathan Fillion"}, "character": {"name": "Captain Malcolm 'Mal' Reynolds"}},
      {"person": {"name": "Gina Torres"}, "character": {"name": "Zoe Washburne"}},
      {"person": {"name": "Alan Tudyk"}, "character": {"name": "Hoban 'Wash' Washburne"}}
    ],
    "crew": [
      {"type": "Creator", "person": {"name": "Joss Whedon"}},
      {"type": "Executive Producer", "person": {"name": "Tim Minear"}},
      {"type": "Composer", "person": {"name": "Greg Edmonson"}}
    ]
  }
}"#;

/// IGDB `/v4/games` Apicalypse reply
pub const IGDB_SEARCH_MEGAMAN: &str = r#"[
  {
    "id": 1068,
    "name": "Mega Man 3",
    "first_release_date": 654739200,
    "genres": [8],
    "platforms": [18],
    "summary": "Dr. Wily strikes again with eight new Robot Masters.",
    "age_ratings": [
      {"category": 1, "rating": 10},
      {"category": 2, "rating": 2}
    ],
    "involved_companies": [
      {"company": 70, "developer": true, "publisher": false},
      {"company": 70, "developer": false, "publisher": true}
    ],
    "cover": {"url": "//images.igdb.com/igdb/image/upload/t_thumb/co1xyz.jpg"}
  }
]"#;

/// IGDB `/v4/companies` reply for `where id = (70)`
pub const IGDB_COMPANIES: &str = r#"[{"id": 70, "name": "Capcom"}]"#;

/// IGDB token endpoint reply
pub const IGDB_TOKEN: &str = r#"{"access_token": "fresh-bearer", "expires_in": 5184000, "token_type": "bearer"}"#;

/// TheGamesDB `/v1.1/Games/ByGameName` reply
pub const TGDB_SEARCH_MEGAMAN: &str = r#"{
  "code": 200,
  "data": {
    "count": 2,
    "games": [
      {
        "id": 161,
        "game_title": "Mega Man 3",
        "release_date": "1990-09-28",
        "platform": 7,
        "players": 1,
        "overview": "The third chapter in the Mega Man saga.",
        "rating": "E - Everyone",
        "developers": [6051],
        "genres": [1],
        "publishers": [3]
      },
      {
        "id": 7214,
        "game_title": "Mega Man X3",
        "release_date": "1995-12-01",
        "platform": 6,
        "players": 1,
        "overview": "Zero and X team up.",
        "rating": "T - Teen",
        "developers": [6051],
        "genres": [1, 8],
        "publishers": [3]
      }
    ]
  },
  "pages": {"previous": null, "current": 1, "next": null}
}"#;

/// TheGamesDB `/v1/Genres` reply (keyed object map)
pub const TGDB_GENRES: &str = r#"{
  "code": 200,
  "data": {
    "count": 2,
    "genres": {
      "1": {"id": 1, "name": "Action"},
      "8": {"id": 8, "name": "Platform"}
    }
  }
}"#;

/// TheGamesDB `/v1/Developers` reply
pub const TGDB_DEVELOPERS: &str = r#"{
  "code": 200,
  "data": {
    "count": 1,
    "developers": {
      "6051": {"id": 6051, "name": "Capcom"}
    }
  }
}"#;

/// TheGamesDB `/v1/Publishers` reply
pub const TGDB_PUBLISHERS: &str = r#"{
  "code": 200,
  "data": {
    "count": 1,
    "publishers": {
      "3": {"id": 3, "name": "Capcom"}
    }
  }
}"#;

/// TheGamesDB `/v1/Platforms` reply
pub const TGDB_PLATFORMS: &str = r#"{
  "code": 200,
  "data": {
    "count": 2,
    "platforms": {
      "6": {"id": 6, "name": "Super Nintendo (SNES)"},
      "7": {"id": 7, "name": "Nintendo Entertainment System (NES)"}
    }
  }
}"#;

/// First page of a paged TheGamesDB search
pub const TGDB_SEARCH_PAGED: &str = r#"{
  "code": 200,
  "data": {
    "count": 1,
    "games": [
      {
        "id": 161,
        "game_title": "Mega Man 3",
        "release_date": "1990-09-28",
        "platform": 7,
        "players": 1,
        "overview": "The third chapter.",
        "rating": "E - Everyone",
        "developers": [6051],
        "genres": [1],
        "publishers": [3]
      }
    ]
  },
  "pages": {"previous": null, "current": 1, "next": "https://api.thegamesdb.net/v1.1/Games/ByGameName?page=2"}
}"#;

/// Final page of the paged TheGamesDB search
pub const TGDB_SEARCH_LAST_PAGE: &str = r#"{
  "code": 200,
  "data": {
    "count": 1,
    "games": [
      {
        "id": 7214,
        "game_title": "Mega Man X3",
        "release_date": "1995-12-01",
        "platform": 6,
        "players": 1,
        "overview": "Zero and X team up.",
        "rating": "T - Teen",
        "developers": [6051],
        "genres": [1],
        "publishers": [3]
      }
    ]
  },
  "pages": {"previous": "https://api.thegamesdb.net/v1.1/Games/ByGameName?page=1", "current": 2, "next": null}
}"#;

/// MobyGames `/v1/games?title=...` reply
pub const MOBY_SEARCH_MEGAMAN: &str = r#"{
  "games": [
    {
      "game_id": 11515,
      "title": "Mega Man 3",
      "description": "<p>Mega Man faces Dr. Wily once more.</p>",
      "genres": [
        {"genre_category": "Basic Genres", "genre_name": "Action"}
      ],
      "platforms": [
        {"platform_id": 22, "platform_name": "NES", "first_release_date": "1990"},
        {"platform_id": 82, "platform_name": "Wii", "first_release_date": "2008"}
      ],
      "sample_cover": {
        "image": "https://cdn.mobygames.com/covers/4080222-mega-man-3-nes-front-cover.jpg"
      }
    }
  ]
}"#;

/// MobyGames `/v1/games/{id}/platforms/{pid}` reply
pub const MOBY_PLATFORM_MEGAMAN: &str = r#"{
  "attributes": [
    {"attribute_category_name": "ESRB Rating", "attribute_name": "E"},
    {"attribute_category_name": "Number of Players Supported", "attribute_name": "1 Player"}
  ],
  "releases": [
    {
      "companies": [
        {"role": "Developed by", "company_name": "Capcom Co., Ltd."},
        {"role": "Published by", "company_name": "Capcom U.S.A., Inc."}
      ],
      "release_date": "1990-09-28"
    }
  ]
}"#;

/// MobyGames `/v1/games/{id}/platforms/{pid}/covers` reply
pub const MOBY_COVERS_MEGAMAN: &str = r#"{
  "cover_groups": [
    {
      "countries": ["United States"],
      "covers": [
        {"scan_of": "Front Cover", "image": "https://cdn.mobygames.com/covers/4080222-front.jpg"},
        {"scan_of": "Back Cover", "image": "https://cdn.mobygames.com/covers/4080223-back.jpg"}
      ]
    }
  ]
}"#;

/// MusicBrainz `/ws/2/release?query=...` reply, 2 of 3 total hits
pub const MUSICBRAINZ_RELEASES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://musicbrainz.org/ns/mmd-2.0#">
  <release-list count="3" offset="0">
    <release id="mbid-0001">
      <title>The Black Parade</title>
      <date>2006-10-23</date>
      <artist-credit><name-credit><artist><name>My Chemical Romance</name></artist></name-credit></artist-credit>
    </release>
    <release id="mbid-0002">
      <title>The Black Parade Is Dead!</title>
      <date>2008-07-01</date>
      <artist-credit><name-credit><artist><name>My Chemical Romance</name></artist></name-credit></artist-credit>
    </release>
  </release-list>
</metadata>"#;

/// Canonical form of [`MUSICBRAINZ_RELEASES`] as the stylesheet emits it
pub const MUSICBRAINZ_CANONICAL: &str = r#"<collection type="music">
  <entry>
    <title>The Black Parade</title>
    <artist>My Chemical Romance</artist>
    <year>2006</year>
  </entry>
  <entry>
    <title>The Black Parade Is Dead!</title>
    <artist>My Chemical Romance</artist>
    <year>2008</year>
  </entry>
</collection>"#;

/// Second page of the MusicBrainz query (offset 2 of 3)
pub const MUSICBRAINZ_RELEASES_PAGE2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://musicbrainz.org/ns/mmd-2.0#">
  <release-list count="3" offset="2">
    <release id="mbid-0003">
      <title>Welcome to the Black Parade</title>
      <date>2006-09-11</date>
      <artist-credit><name-credit><artist><name>My Chemical Romance</name></artist></name-credit></artist-credit>
    </release>
  </release-list>
</metadata>"#;

pub const MUSICBRAINZ_CANONICAL_PAGE2: &str = r#"<collection type="music">
  <entry>
    <title>Welcome to the Black Parade</title>
    <artist>My Chemical Romance</artist>
    <year>2006</year>
  </entry>
</collection>"#;

/// BoardGameGeek `/xmlapi2/search` reply
pub const BGG_SEARCH_CATAN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items total="1">
  <item type="boardgame" id="13">
    <name type="primary" value="CATAN"/>
    <yearpublished value="1995"/>
  </item>
</items>"#;

/// BoardGameGeek `/xmlapi2/thing` reply
pub const BGG_THING_CATAN: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<items>
  <item type="boardgame" id="13">
    <name type="primary" value="CATAN"/>
    <yearpublished value="1995"/>
    <minplayers value="3"/>
    <maxplayers value="4"/>
    <playingtime value="120"/>
    <link type="boardgamedesigner" id="11" value="Klaus Teuber"/>
    <link type="boardgamepublisher" id="37" value="KOSMOS"/>
  </item>
</items>"#;

/// Canonical form of [`BGG_THING_CATAN`]
pub const BGG_CANONICAL_CATAN: &str = r#"<collection type="boardgame">
  <entry>
    <title>CATAN</title>
    <year>1995</year>
    <designer>Klaus Teuber</designer>
    <publisher>KOSMOS</publisher>
    <num-player>4</num-player>
    <playing-time>120</playing-time>
  </entry>
</collection>"#;

/// Arcade History search results page
pub const ARCADE_HISTORY_PAGE: &str = r#"<html><body>
<div class='page_datNOM'><a href="detail.php?lien=12345">Galaga &copy; Namco</a></div>
<div class='page_datDAT'>Galaga &copy; 1981 Namco, Ltd.</div>
<div class='page_datNOM'><a href="detail.php?lien=12346">Galaga '88 &copy; Namco</a></div>
<div class='page_datDAT'>Galaga '88 &copy; 1987 Namco, Ltd.</div>
</body></html>"#;
