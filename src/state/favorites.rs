use dashmap::DashMap;
use indexmap::IndexSet;

/// Favourite songs per user, in the order they were liked.
#[derive(Debug, Default)]
pub struct FavoriteStore {
    by_user: DashMap<String, IndexSet<String>>,
}

impl FavoriteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the favourite flag of `song` for `user_id`, or flip it when `liked` is `None`.
    ///
    /// Returns the flag after the update.
    pub fn toggle(&self, user_id: &str, song: &str, liked: Option<bool>) -> bool {
        let liked = {
            let mut songs = self.by_user.entry(user_id.to_string()).or_default();
            let target = liked.unwrap_or(!songs.contains(song));
            if target {
                songs.insert(song.to_string());
            } else {
                songs.shift_remove(song);
            }
            target
        };

        self.by_user.remove_if(user_id, |_, songs| songs.is_empty());
        liked
    }

    pub fn is_favorite(&self, user_id: &str, song: &str) -> bool {
        self.by_user
            .get(user_id)
            .is_some_and(|songs| songs.contains(song))
    }

    /// Songs liked by `user_id`, oldest like first.
    pub fn list(&self, user_id: &str) -> Vec<String> {
        self.by_user
            .get(user_id)
            .map(|songs| songs.iter().cloned().collect())
            .unwrap_or_default()
    }
}
