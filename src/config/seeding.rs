use anyhow::{Context, Result};
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

use crate::auth::{UserRole, UserSession};
use crate::models::*;
use crate::services::*;

const OWNER_PASSWORD: &str = "gymowner123";
const CLIENT_PASSWORD: &str = "client123";

/// Credentials of the bootstrap super admin.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub admin_username: String,
    pub admin_email: String,
    pub admin_password: String,
}

impl SeedConfig {
    pub fn from_env() -> Self {
        Self {
            admin_username: env::var("SEED_ADMIN_USERNAME").unwrap_or_else(|_| "superadmin".to_string()),
            admin_email: env::var("SEED_ADMIN_EMAIL")
                .unwrap_or_else(|_| "superadmin@example.com".to_string()),
            admin_password: env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "superadmin123".to_string()),
        }
    }
}

/// Fills an empty database with demo data. Every step skips records that
/// already exist, so running it twice is harmless.
pub struct DatabaseSeeder {
    pool: PgPool,
    config: SeedConfig,
    users: UserService,
    gyms: GymService,
    rooms: TrainingRoomService,
    exercise_types: ExerciseTypeService,
    themes: ThemeService,
    badges: BadgeService,
    challenges: ChallengeService,
}

impl DatabaseSeeder {
    pub fn new(pool: PgPool, config: SeedConfig) -> Self {
        let users = UserService::new(pool.clone());
        let badges = BadgeService::new(pool.clone());
        Self {
            challenges: ChallengeService::new(pool.clone(), badges.clone()),
            gyms: GymService::new(pool.clone()),
            rooms: TrainingRoomService::new(pool.clone()),
            exercise_types: ExerciseTypeService::new(pool.clone()),
            themes: ThemeService::new(pool.clone()),
            users,
            badges,
            pool,
            config,
        }
    }

    pub async fn seed_all(&self) -> Result<()> {
        tracing::info!("Starting database seeding...");

        let admin = self.seed_admin().await?;
        let owners = self.seed_users("gymowner", "GymOwner", "Pro", 3, UserRole::GymOwner, OWNER_PASSWORD).await?;
        let clients = self.seed_users("client", "Client", "User", 15, UserRole::Client, CLIENT_PASSWORD).await?;
        let gyms = self.seed_gyms(&owners).await?;
        let exercise_types = self.seed_exercise_types().await?;
        self.seed_training_rooms(&admin, &gyms, &exercise_types).await?;
        self.seed_themes().await?;
        self.seed_badges().await?;
        let challenges = self.seed_challenges(&owners, &clients, &gyms, &exercise_types).await?;
        self.seed_participations(&clients, &challenges).await?;
        self.seed_invitation(&clients, &challenges).await?;

        tracing::info!("Database seeding completed!");
        Ok(())
    }

    async fn seed_admin(&self) -> Result<User> {
        if let Some(user) = self.users.find_by_username(&self.config.admin_username).await? {
            return Ok(user);
        }

        let admin = self
            .users
            .create_user(
                CreateUserRequest {
                    username: self.config.admin_username.clone(),
                    email: self.config.admin_email.clone(),
                    password: self.config.admin_password.clone(),
                    first_name: "Super".to_string(),
                    last_name: "Admin".to_string(),
                },
                UserRole::SuperAdmin,
            )
            .await
            .context("creating the super admin")?;

        tracing::info!(username = %admin.username, "Created super admin");
        Ok(admin)
    }

    async fn seed_users(
        &self,
        prefix: &str,
        first_name: &str,
        last_name: &str,
        count: usize,
        role: UserRole,
        password: &str,
    ) -> Result<Vec<User>> {
        let mut users = Vec::with_capacity(count);
        for i in 1..=count {
            let username = format!("{}{}", prefix, i);
            let user = match self.users.find_by_username(&username).await? {
                Some(user) => user,
                None => {
                    self.users
                        .create_user(
                            CreateUserRequest {
                                email: format!("{}@example.com", username),
                                username,
                                password: password.to_string(),
                                first_name: format!("{}{}", first_name, i),
                                last_name: format!("{}{}", last_name, i),
                            },
                            role,
                        )
                        .await?
                }
            };
            users.push(user);
        }

        tracing::info!(role = %role, count = users.len(), "Seeded users");
        Ok(users)
    }

    async fn seed_gyms(&self, owners: &[User]) -> Result<Vec<Gym>> {
        let owner = owners.first().context("no gym owner to attach gyms to")?;
        let demo_gyms = [
            (
                "Downtown Fitness Center",
                "123 Main Street, Cityville",
                "contact@downtownfitness.com",
                "123-456-7890",
                "Spacious gym with modern equipment and classes.",
            ),
            (
                "Elite Gym Club",
                "456 High Street, Townsville",
                "info@elitegymclub.com",
                "987-654-3210",
                "Premium training facilities with personal coaching.",
            ),
        ];

        let mut gyms = Vec::new();
        for (name, address, email, phone, description) in demo_gyms {
            let existing = sqlx::query_as::<_, Gym>("SELECT * FROM gyms WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

            let gym = match existing {
                Some(gym) => gym,
                None => {
                    self.gyms
                        .create_gym(CreateGymRequest {
                            name: name.to_string(),
                            address: address.to_string(),
                            contact_email: email.to_string(),
                            contact_phone: Some(phone.to_string()),
                            description: Some(description.to_string()),
                            equipment: vec!["free weights".to_string(), "cardio machines".to_string()],
                            activities: vec!["strength".to_string(), "cardio".to_string()],
                            owner_id: owner.id,
                            is_approved: true,
                        })
                        .await?
                }
            };
            gyms.push(gym);
        }

        tracing::info!(count = gyms.len(), "Seeded gyms");
        Ok(gyms)
    }

    async fn seed_exercise_types(&self) -> Result<Vec<ExerciseType>> {
        let demo_types: [(&str, &str, &[&str]); 5] = [
            (
                "Upper Body Strength",
                "Exercises building the muscles of the upper body",
                &["chest", "biceps", "triceps", "shoulders", "back"],
            ),
            (
                "Cardio Training",
                "Cardiovascular work to improve endurance",
                &["heart", "legs", "core"],
            ),
            (
                "Leg Strength",
                "Strengthening work for the lower limbs",
                &["quadriceps", "hamstrings", "calves", "glutes"],
            ),
            (
                "Yoga & Stretching",
                "Flexibility and relaxation exercises",
                &["full body", "core", "back"],
            ),
            (
                "CrossFit",
                "High intensity functional training",
                &["full body", "core", "legs", "arms"],
            ),
        ];

        let existing = self.exercise_types.list().await?;
        let mut types = Vec::new();
        for (name, description, muscles) in demo_types {
            if let Some(found) = existing.iter().find(|t| t.name == name) {
                types.push(found.clone());
                continue;
            }

            let created = self
                .exercise_types
                .create(CreateExerciseTypeRequest {
                    name: name.to_string(),
                    description: description.to_string(),
                    targeted_muscles: muscles.iter().map(|m| m.to_string()).collect(),
                })
                .await?;
            types.push(created);
        }

        tracing::info!(count = types.len(), "Seeded exercise types");
        Ok(types)
    }

    async fn seed_training_rooms(&self, admin: &User, gyms: &[Gym], types: &[ExerciseType]) -> Result<()> {
        let session = session_for(admin);
        let type_id = |index: usize| types.get(index).map(|t| t.id);

        let mut created = 0;
        for gym in gyms {
            let rooms = [
                ("Strength Room", 25, DifficultyLevel::Advanced, type_id(0)),
                ("Cardio Studio", 20, DifficultyLevel::Beginner, type_id(1)),
                ("CrossFit Box", 15, DifficultyLevel::Advanced, type_id(4)),
                ("Yoga Studio", 12, DifficultyLevel::Beginner, type_id(3)),
            ];

            for (label, capacity, difficulty_level, assigned_exercise_type_id) in rooms {
                let name = format!("{} - {}", label, gym.name);
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM training_rooms WHERE name = $1)")
                        .bind(&name)
                        .fetch_one(&self.pool)
                        .await?;
                if exists {
                    continue;
                }

                self.rooms
                    .create_room(
                        &session,
                        CreateTrainingRoomRequest {
                            name,
                            capacity,
                            equipment: vec!["mats".to_string()],
                            features: vec!["air conditioning".to_string()],
                            difficulty_level: Some(difficulty_level),
                            assigned_exercise_type_id,
                            gym_id: gym.id,
                        },
                    )
                    .await?;
                created += 1;
            }
        }

        tracing::info!(created, "Seeded training rooms");
        Ok(())
    }

    async fn seed_themes(&self) -> Result<()> {
        for tier in ThemeTier::ALL {
            if self.themes.find_by_slug(tier.slug()).await?.is_some() {
                continue;
            }

            self.themes
                .create(CreateThemeRequest {
                    name: tier.display_name().to_string(),
                    description: tier.description().to_string(),
                    slug: Some(tier.slug().to_string()),
                    colors: tier.palette(),
                    is_active: true,
                })
                .await?;
        }

        tracing::info!("Seeded themes");
        Ok(())
    }

    async fn seed_badges(&self) -> Result<()> {
        let tier_badges = [
            ("Débutant", "Complete your first challenge", "completedChallenges >= 1", ThemeTier::Beginner),
            ("Intermédiaire", "Complete five challenges", "completedChallenges >= 5", ThemeTier::Intermediate),
            ("Avancé", "Complete ten challenges", "completedChallenges >= 10", ThemeTier::Advanced),
            ("Champion", "Complete twenty challenges", "completedChallenges >= 20", ThemeTier::Champion),
        ];

        let existing = self.badges.list().await?;
        for (name, description, rule, tier) in tier_badges {
            if existing.iter().any(|b| b.name == name) {
                continue;
            }

            let theme_id = self.themes.find_by_slug(tier.slug()).await?.map(|t| t.id);
            self.badges
                .create(CreateBadgeRequest {
                    name: name.to_string(),
                    description: description.to_string(),
                    icon_url: format!("/icons/badges/{}.svg", tier.slug()),
                    rule: rule.to_string(),
                    theme_id,
                })
                .await?;
        }

        tracing::info!("Seeded badges");
        Ok(())
    }

    async fn seed_challenges(
        &self,
        owners: &[User],
        clients: &[User],
        gyms: &[Gym],
        types: &[ExerciseType],
    ) -> Result<Vec<Challenge>> {
        let owner = owners.first().context("no gym owner to create challenges")?;
        let client = clients.first().context("no client to create challenges")?;
        let gym = gyms
            .iter()
            .find(|g| g.owner_id == owner.id)
            .context("the first gym owner has no gym")?;
        let type_ids: Vec<Uuid> = types.iter().map(|t| t.id).collect();

        let demo_challenges = [
            (
                owner,
                "Fat Burner Challenge",
                "An intense challenge to burn as many calories as possible.",
                Some(gym.id),
                type_ids.iter().take(1).copied().collect::<Vec<_>>(),
                45,
                DifficultyLevel::Intermediate,
                ChallengeGoal::LoseWeight,
            ),
            (
                client,
                "Home Cardio Challenge",
                "A personal challenge to boost cardio at home.",
                None,
                Vec::new(),
                30,
                DifficultyLevel::Beginner,
                ChallengeGoal::ImproveEndurance,
            ),
            (
                owner,
                "Advanced Strength Program",
                "An advanced strength programme for regulars.",
                Some(gym.id),
                type_ids.iter().take(2).copied().collect::<Vec<_>>(),
                60,
                DifficultyLevel::Advanced,
                ChallengeGoal::GainMuscle,
            ),
        ];

        let mut challenges = Vec::new();
        for (creator, title, description, gym_id, exercise_ids, duration, difficulty_level, goals) in demo_challenges {
            let existing = sqlx::query_as::<_, Challenge>("SELECT * FROM challenges WHERE title = $1")
                .bind(title)
                .fetch_optional(&self.pool)
                .await?;

            let challenge = match existing {
                Some(challenge) => challenge,
                None => {
                    self.challenges
                        .create(
                            &session_for(creator),
                            CreateChallengeRequest {
                                title: title.to_string(),
                                description: description.to_string(),
                                gym_id,
                                recommended_exercise_type_ids: exercise_ids,
                                duration,
                                difficulty_level,
                                goals,
                            },
                        )
                        .await?
                }
            };
            challenges.push(challenge);
        }

        tracing::info!(count = challenges.len(), "Seeded challenges");
        Ok(challenges)
    }

    /// Clients join challenges and log sessions through the progress tracker,
    /// so scores and badges come out as they would in production.
    async fn seed_participations(&self, clients: &[User], challenges: &[Challenge]) -> Result<()> {
        let plans: [(usize, usize, &[(f64, f64)]); 4] = [
            (1, 0, &[(40.0, 350.0), (35.0, 300.0), (30.0, 280.0)]),
            (2, 0, &[(25.0, 200.0), (20.0, 180.0)]),
            (1, 2, &[(50.0, 420.0)]),
            (3, 1, &[]),
        ];

        for (client_index, challenge_index, sessions) in plans {
            let (Some(client), Some(challenge)) = (clients.get(client_index), challenges.get(challenge_index)) else {
                continue;
            };

            let current = self.challenges.get(challenge.id).await?;
            if current.participant(client.id).is_some() {
                continue;
            }

            self.challenges.participate(client.id, challenge.id).await?;
            for (progress, calories_burned) in sessions.iter().copied() {
                self.challenges
                    .update_progress(
                        client.id,
                        challenge.id,
                        ProgressUpdate {
                            progress,
                            calories_burned,
                        },
                    )
                    .await?;
            }
        }

        tracing::info!("Seeded participations");
        Ok(())
    }

    async fn seed_invitation(&self, clients: &[User], challenges: &[Challenge]) -> Result<()> {
        let (Some(sender), Some(receiver), Some(challenge)) = (clients.get(1), clients.get(4), challenges.get(1)) else {
            return Ok(());
        };

        let current = self.challenges.get(challenge.id).await?;
        if current.participant(receiver.id).is_none() {
            self.challenges.invite(sender.id, challenge.id, receiver.id).await?;
            tracing::info!(challenge_id = %challenge.id, "Seeded invitation");
        }

        Ok(())
    }
}

fn session_for(user: &User) -> UserSession {
    UserSession {
        user_id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
        role: user.role,
    }
}
