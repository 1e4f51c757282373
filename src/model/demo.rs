use super::{GrantLocation, GrantRecord, Outcome};

/// Sample dataset: two winners (one partially funded) and two losers.
pub fn demo_grants() -> Vec<GrantRecord> {
    vec![
        GrantRecord {
            id: "1".to_string(),
            title: "Community Garden Initiative".to_string(),
            outcome: Outcome::Won,
            organization: Some("Green Earth Co.".to_string()),
            amount_requested: Some(50_000.0),
            amount_awarded: Some(50_000.0),
            locations: Some(vec![GrantLocation::TosaSlc, GrantLocation::TosvSlc]),
            content: "Project Abstract: Green Earth Co. proposes the \"Urban Roots\" initiative to \
                transform three vacant lots in the downtown district into sustainable community gardens.\n\n\
                Impact: This project directly addresses food insecurity by providing free organic produce \
                to 200+ low-income families annually.\n\n\
                Sustainability: We have secured a 5-year land use agreement with the city and partnered \
                with local schools for ongoing maintenance, ensuring long-term viability beyond the grant period.\n\n\
                Budget: 85% of funds go directly to materials and seeds, with 15% for educational workshops."
                .to_string(),
        },
        GrantRecord {
            id: "2".to_string(),
            title: "Tech for Seniors".to_string(),
            outcome: Outcome::Lost,
            organization: Some("Silver Surfers NGO".to_string()),
            amount_requested: Some(75_000.0),
            amount_awarded: Some(0.0),
            locations: Some(vec![GrantLocation::TosaDenver]),
            content: "We want to buy iPads for seniors in the nursing home. It is important because \
                technology is the future.\n\n\
                Plan: Buy 100 iPads. Give them to the nursing home staff to distribute.\n\n\
                Budget: $75,000 for hardware.\n\n\
                Goals: Make seniors happy and connected."
                .to_string(),
        },
        GrantRecord {
            id: "3".to_string(),
            title: "Youth Coding Bootcamp".to_string(),
            outcome: Outcome::Won,
            organization: Some("CodeFuture".to_string()),
            amount_requested: Some(120_000.0),
            amount_awarded: Some(100_000.0),
            locations: Some(vec![GrantLocation::TosaSlc, GrantLocation::TosaDenver]),
            content: "The CodeFuture Bootcamp is a proven 12-week curriculum designed to equip at-risk \
                youth with full-stack development skills.\n\n\
                Outcomes: In our pilot program, 80% of graduates secured internships within 3 months. \
                This grant will scale the program to serve 50 additional students.\n\n\
                Metrics: We track job placement, starting salary, and long-term retention.\n\n\
                Partnerships: Secured hiring commitments from 3 local tech firms."
                .to_string(),
        },
        GrantRecord {
            id: "4".to_string(),
            title: "Art Awareness Campaign".to_string(),
            outcome: Outcome::Lost,
            organization: Some("ArtForAll".to_string()),
            amount_requested: Some(20_000.0),
            amount_awarded: Some(0.0),
            locations: Some(vec![GrantLocation::TosvSlc]),
            content: "We need funding to raise awareness about art. Art is beautiful and everyone \
                should see it. We plan to print flyers and put them around town.\n\n\
                Budget: Mostly for printing and some for snacks at meetings.\n\n\
                Impact: People will see the flyers and think about art more."
                .to_string(),
        },
    ]
}
