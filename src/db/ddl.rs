//! SQL table, index and trigger definitions
//!
//! Mirrors `crate::schema`. Ownership edges cascade on delete; plain
//! references restrict. SQLite ignores declared column widths, so the
//! widths are spelled out as CHECK constraints.

pub const CREATE_LIQUID_CALIBRATION: &str = r#"
CREATE TABLE IF NOT EXISTS liquid_calibration (
    setup TEXT NOT NULL CHECK (length(setup) <= 256),
    probe INTEGER NOT NULL,
    date DATE NOT NULL,
    PRIMARY KEY (setup, probe, date)
)
"#;

pub const CREATE_PULSE_WEIGHT: &str = r#"
CREATE TABLE IF NOT EXISTS liquid_calibration_pulse_weight (
    setup TEXT NOT NULL,
    probe INTEGER NOT NULL,
    date DATE NOT NULL,
    pulse_dur INTEGER NOT NULL,
    pulse_num INTEGER NOT NULL,
    weight REAL NOT NULL,
    PRIMARY KEY (setup, probe, date, pulse_dur),
    FOREIGN KEY (setup, probe, date) REFERENCES liquid_calibration(setup, probe, date) ON DELETE CASCADE
)
"#;

pub const CREATE_EXPERIMENT_TYPE: &str = r#"
CREATE TABLE IF NOT EXISTS experiment_type (
    exp_type TEXT PRIMARY KEY NOT NULL CHECK (length(exp_type) <= 128),
    description TEXT NOT NULL DEFAULT '' CHECK (length(description) <= 2048)
)
"#;

pub const CREATE_TASK: &str = r#"
CREATE TABLE IF NOT EXISTS task (
    task_idx INTEGER PRIMARY KEY NOT NULL,
    exp_type TEXT NOT NULL,
    intertrial_duration INTEGER NOT NULL DEFAULT 30,
    trial_duration INTEGER NOT NULL DEFAULT 30,
    timeout_duration INTEGER NOT NULL DEFAULT 180,
    airpuff_duration INTEGER NOT NULL DEFAULT 400,
    response_interval INTEGER NOT NULL DEFAULT 1000,
    reward_amount INTEGER NOT NULL DEFAULT 8,
    silence_thr INTEGER NOT NULL DEFAULT 30,
    conditions TEXT NOT NULL CHECK (length(conditions) <= 4095),
    description TEXT NOT NULL DEFAULT '' CHECK (length(description) <= 2048),
    FOREIGN KEY (exp_type) REFERENCES experiment_type(exp_type)
)
"#;

pub const CREATE_MOUSE_WEIGHT: &str = r#"
CREATE TABLE IF NOT EXISTS mouse_weight (
    animal_id INTEGER NOT NULL,
    timestamp TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
    weight REAL NOT NULL,
    PRIMARY KEY (animal_id, timestamp)
)
"#;

pub const CREATE_SESSION: &str = r#"
CREATE TABLE IF NOT EXISTS session (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL CHECK (session_id BETWEEN -32768 AND 32767),
    intertrial_duration INTEGER NOT NULL,
    trial_duration INTEGER NOT NULL,
    timeout_duration INTEGER NOT NULL,
    airpuff_duration INTEGER NOT NULL,
    response_interval INTEGER NOT NULL,
    reward_amount INTEGER NOT NULL,
    setup TEXT NOT NULL CHECK (length(setup) <= 256),
    session_tmst TIMESTAMP NOT NULL,
    notes TEXT NOT NULL DEFAULT '' CHECK (length(notes) <= 2048),
    PRIMARY KEY (animal_id, session_id)
)
"#;

pub const CREATE_CONDITION: &str = r#"
CREATE TABLE IF NOT EXISTS condition (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    cond_idx INTEGER NOT NULL CHECK (cond_idx BETWEEN -32768 AND 32767),
    PRIMARY KEY (animal_id, session_id, cond_idx),
    FOREIGN KEY (animal_id, session_id) REFERENCES session(animal_id, session_id) ON DELETE CASCADE
)
"#;

pub const CREATE_TRIAL: &str = r#"
CREATE TABLE IF NOT EXISTS trial (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    cond_idx INTEGER NOT NULL,
    trial_idx INTEGER NOT NULL CHECK (trial_idx BETWEEN -32768 AND 32767),
    start_time INTEGER NOT NULL,
    end_time INTEGER NOT NULL,
    last_flip_count INTEGER NOT NULL,
    PRIMARY KEY (animal_id, session_id, cond_idx, trial_idx),
    FOREIGN KEY (animal_id, session_id) REFERENCES session(animal_id, session_id) ON DELETE CASCADE,
    FOREIGN KEY (animal_id, session_id, cond_idx) REFERENCES condition(animal_id, session_id, cond_idx) ON DELETE CASCADE
)
"#;

pub const CREATE_LICK: &str = r#"
CREATE TABLE IF NOT EXISTS lick (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    time INTEGER NOT NULL,
    probe INTEGER NOT NULL,
    PRIMARY KEY (animal_id, session_id, time),
    FOREIGN KEY (animal_id, session_id) REFERENCES session(animal_id, session_id) ON DELETE CASCADE
)
"#;

pub const CREATE_LIQUID_DELIVERY: &str = r#"
CREATE TABLE IF NOT EXISTS liquid_delivery (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    time INTEGER NOT NULL,
    probe INTEGER NOT NULL,
    PRIMARY KEY (animal_id, session_id, time),
    FOREIGN KEY (animal_id, session_id) REFERENCES session(animal_id, session_id) ON DELETE CASCADE
)
"#;

pub const CREATE_AIRPUFF_DELIVERY: &str = r#"
CREATE TABLE IF NOT EXISTS airpuff_delivery (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    time INTEGER NOT NULL,
    PRIMARY KEY (animal_id, session_id, time),
    FOREIGN KEY (animal_id, session_id) REFERENCES session(animal_id, session_id) ON DELETE CASCADE
)
"#;

pub const CREATE_MOVIE: &str = r#"
CREATE TABLE IF NOT EXISTS movie (
    movie_name TEXT PRIMARY KEY NOT NULL CHECK (length(movie_name) <= 8),
    path TEXT NOT NULL CHECK (length(path) <= 255),
    movie_class TEXT NOT NULL CHECK (movie_class IN ('mousecam', 'object3d', 'madmax')),
    original_file TEXT NOT NULL CHECK (length(original_file) <= 255),
    file_template TEXT NOT NULL CHECK (length(file_template) <= 255),
    file_duration REAL NOT NULL,
    codec TEXT NOT NULL DEFAULT '-c:v libx264 -preset slow -crf 5' CHECK (length(codec) <= 255),
    movie_description TEXT NOT NULL CHECK (length(movie_description) <= 255)
)
"#;

pub const CREATE_MOVIE_STILL: &str = r#"
CREATE TABLE IF NOT EXISTS movie_still (
    movie_name TEXT NOT NULL,
    still_id INTEGER NOT NULL,
    still_frame BLOB NOT NULL,
    PRIMARY KEY (movie_name, still_id),
    FOREIGN KEY (movie_name) REFERENCES movie(movie_name) ON DELETE CASCADE
)
"#;

pub const CREATE_MOVIE_CLIP: &str = r#"
CREATE TABLE IF NOT EXISTS movie_clip (
    movie_name TEXT NOT NULL,
    clip_number INTEGER NOT NULL,
    file_name TEXT NOT NULL CHECK (length(file_name) <= 255),
    clip BLOB NOT NULL,
    PRIMARY KEY (movie_name, clip_number),
    FOREIGN KEY (movie_name) REFERENCES movie(movie_name) ON DELETE CASCADE
)
"#;

pub const CREATE_MOVIE_CLIP_COND: &str = r#"
CREATE TABLE IF NOT EXISTS movie_clip_cond (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    cond_idx INTEGER NOT NULL,
    movie_name TEXT NOT NULL,
    clip_number INTEGER NOT NULL,
    PRIMARY KEY (animal_id, session_id, cond_idx),
    FOREIGN KEY (animal_id, session_id, cond_idx) REFERENCES condition(animal_id, session_id, cond_idx) ON DELETE CASCADE,
    FOREIGN KEY (movie_name, clip_number) REFERENCES movie_clip(movie_name, clip_number)
)
"#;

pub const CREATE_GRATING_COND: &str = r#"
CREATE TABLE IF NOT EXISTS grating_cond (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    cond_idx INTEGER NOT NULL,
    direction INTEGER NOT NULL,
    spatial_period INTEGER NOT NULL,
    temporal_freq REAL NOT NULL,
    contrast INTEGER NOT NULL DEFAULT 100 CHECK (contrast BETWEEN 0 AND 100),
    phase REAL NOT NULL DEFAULT 0,
    PRIMARY KEY (animal_id, session_id, cond_idx),
    FOREIGN KEY (animal_id, session_id, cond_idx) REFERENCES condition(animal_id, session_id, cond_idx) ON DELETE CASCADE
)
"#;

pub const CREATE_REWARD_COND: &str = r#"
CREATE TABLE IF NOT EXISTS reward_cond (
    animal_id INTEGER NOT NULL,
    session_id INTEGER NOT NULL,
    cond_idx INTEGER NOT NULL,
    probe INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (animal_id, session_id, cond_idx),
    FOREIGN KEY (animal_id, session_id, cond_idx) REFERENCES condition(animal_id, session_id, cond_idx) ON DELETE CASCADE
)
"#;

/// Tables in dependency order
pub const CREATE_TABLES: &[&str] = &[
    CREATE_LIQUID_CALIBRATION,
    CREATE_PULSE_WEIGHT,
    CREATE_EXPERIMENT_TYPE,
    CREATE_TASK,
    CREATE_MOUSE_WEIGHT,
    CREATE_SESSION,
    CREATE_CONDITION,
    CREATE_TRIAL,
    CREATE_LICK,
    CREATE_LIQUID_DELIVERY,
    CREATE_AIRPUFF_DELIVERY,
    CREATE_MOVIE,
    CREATE_MOVIE_STILL,
    CREATE_MOVIE_CLIP,
    CREATE_MOVIE_CLIP_COND,
    CREATE_GRATING_COND,
    CREATE_REWARD_COND,
];

/// Child-side indexes for foreign keys that are not a key prefix
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_task_exp_type ON task(exp_type)",
    "CREATE INDEX IF NOT EXISTS idx_movie_clip_cond_clip ON movie_clip_cond(movie_name, clip_number)",
    "CREATE INDEX IF NOT EXISTS idx_session_tmst ON session(session_tmst)",
];

/// A condition carries at most one stimulus: each subtype table refuses a
/// row when one of the other two already has one for the same condition.
fn exclusive_stimulus_trigger(table: &str, others: [&str; 2]) -> String {
    let exists = others
        .iter()
        .map(|other| {
            format!(
                "EXISTS (SELECT 1 FROM {other} WHERE animal_id = NEW.animal_id \
                 AND session_id = NEW.session_id AND cond_idx = NEW.cond_idx)"
            )
        })
        .collect::<Vec<_>>()
        .join(" OR ");

    format!(
        "CREATE TRIGGER IF NOT EXISTS {table}_exclusive BEFORE INSERT ON {table} \
         WHEN {exists} \
         BEGIN SELECT RAISE(ABORT, 'stimulus conflict: condition already has a {} or {} row'); END",
        others[0], others[1]
    )
}

fn append_only_trigger(table: &str) -> String {
    format!(
        "CREATE TRIGGER IF NOT EXISTS {table}_append_only BEFORE UPDATE ON {table} \
         BEGIN SELECT RAISE(ABORT, 'append-only table: {table}'); END"
    )
}

/// Session data and lookup rows are written once and never updated
pub const APPEND_ONLY_TABLES: &[&str] = &[
    "session",
    "condition",
    "trial",
    "lick",
    "liquid_delivery",
    "airpuff_delivery",
    "movie_clip_cond",
    "grating_cond",
    "reward_cond",
    "experiment_type",
    "movie",
    "task",
];

pub fn triggers() -> Vec<String> {
    let mut stmts = vec![
        exclusive_stimulus_trigger("movie_clip_cond", ["grating_cond", "reward_cond"]),
        exclusive_stimulus_trigger("grating_cond", ["movie_clip_cond", "reward_cond"]),
        exclusive_stimulus_trigger("reward_cond", ["movie_clip_cond", "grating_cond"]),
    ];
    stmts.extend(APPEND_ONLY_TABLES.iter().map(|t| append_only_trigger(t)));
    stmts
}

/// All schema creation statements
pub fn all_schema_statements() -> Vec<String> {
    let mut stmts: Vec<String> = CREATE_TABLES.iter().map(|s| s.to_string()).collect();
    stmts.extend(CREATE_INDEXES.iter().map(|s| s.to_string()));
    stmts.extend(triggers());
    stmts
}
