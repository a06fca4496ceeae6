use chrono::{Duration, Utc};
use rand::Rng;

const NUM_USERS: i64 = 12;

const NUM_ROOTS: usize = 40;
const NUM_REPLIES: usize = 400;

const COMMENT_MIN_WORDS: usize = 3;
const COMMENT_MAX_WORDS: usize = 40;

/// One in this many comments is soft-deleted
const DELETED_ONE_IN: u32 = 15;

fn gen_n_items(table: &str, columns: &str, n: usize, mut f: impl FnMut(usize) -> String) {
    println!("INSERT INTO {} ({}) VALUES", table, columns);
    for i in 0..n {
        if i != 0 {
            println!(",");
        }
        print!("    {}", f(i));
    }
    println!();
    println!("ON CONFLICT DO NOTHING;");
}

fn gen_comment_text(rng: &mut impl Rng) -> String {
    let words = rng.gen_range(COMMENT_MIN_WORDS..=COMMENT_MAX_WORDS);
    lipsum::lipsum_words_from_seed(words, rng.gen()).replace('\'', "''")
}

fn main() {
    let mut rng = rand::thread_rng();
    let total = NUM_ROOTS + NUM_REPLIES;

    // Roots come first so that every reply can pick an earlier comment as parent
    let mut date = Utc::now() - Duration::days(30);
    gen_n_items(
        "comments",
        "id, parent_id, user_id, text, created_at, deleted",
        total,
        |i| {
            let id = i + 1;
            let parent = match i < NUM_ROOTS {
                true => String::from("NULL"),
                false => rng.gen_range(1..id).to_string(),
            };
            date = date + Duration::seconds(rng.gen_range(1..3600));
            let user = rng.gen_range(1..=NUM_USERS);
            let text = gen_comment_text(&mut rng);
            let deleted = rng.gen_ratio(1, DELETED_ONE_IN);
            format!(
                "({}, {}, {}, '{}', '{}', {})",
                id,
                parent,
                user,
                text,
                date.to_rfc3339(),
                deleted,
            )
        },
    );

    // Explicit ids bypassed the sequence, move it past them
    println!(
        "SELECT setval('comments_id_seq', (SELECT MAX(id) FROM comments));"
    );
}
