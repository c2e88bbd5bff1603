//! Reply texts and the formatting helpers the dialogue controller composes them with.

pub const ROUTE_CLARIFICATION_TEMPLATES: [&str; 8] = [
    "Can you specify your request?",
    "I didn't catch that. Could you restate your route?",
    "I need more details please.",
    "Could you tell me where you're leaving?",
    "Hmm, could you clarify your route?",
    "Please provide me more information.",
    "Help me out here. Where are you traveling?",
    "I need a bit more info to help.",
];

/// `{airlines}` is replaced by the formatted airline list.
pub const MULTI_AIRLINE_TEMPLATES: [&str; 4] = [
    "You have multiple options: {airlines}. Which would you prefer?",
    "You can choose among these airlines for your route: {airlines}.",
    "For your journey, consider these airlines: {airlines}.",
    "Several airlines are available for your route, including {airlines}.",
];

/// `{best_airline}` is replaced by the recommended airline.
pub const RECOMMENDATION_TEMPLATES: [&str; 4] = [
    "Considering all factors, {best_airline} would be a great choice for your trip!",
    "Based on our analysis, {best_airline} is the top recommendation for your route.",
    "You might enjoy traveling with {best_airline}, as it's highly rated for this route.",
    "For a pleasant journey, I'd recommend going with {best_airline} for your route.",
];

pub const NO_CLEAR_BEST_AIRLINE: &str = "No clear best airline found based on the data.";
pub const NO_AIRLINES_FOUND: &str = "No airlines found for this route.";
pub const NOT_ENOUGH_INFORMATION: &str =
    "I don't have enough information to respond to that right now.";
pub const UNRECOGNIZED_TAG: &str = "I'm not sure how to help with that.";
pub const DEFAULT_REPLY: &str = "Sorry, I couldn't understand that. Can you rephrase?";
pub const TURN_FAILURE: &str =
    "Sorry, something went wrong while processing your message. Please try again.";
pub const EMPTY_INPUT: &str = "Please provide a message.";

pub fn single_airline_reply(airline: &str) -> String {
    format!("The only airline available that I can provide for your route is {airline}.")
}

pub fn multi_airline_reply(template: &str, airlines: &[String]) -> String {
    template.replace("{airlines}", &join_airlines(airlines))
}

pub fn recommendation_reply(template: &str, best_airline: &str) -> String {
    template.replace("{best_airline}", best_airline)
}

/// English list with a final "or": `A`, `A or B`, `A, B, or C`.
pub fn join_airlines(airlines: &[String]) -> String {
    match airlines {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [head @ .., last] => format!("{}, or {}", head.join(", "), last),
    }
}

/// Substitutes the default reply for a blank one.
pub fn ensure_reply(reply: String) -> String {
    if reply.trim().is_empty() {
        DEFAULT_REPLY.to_string()
    } else {
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn joins_airline_lists() {
        assert_eq!(join_airlines(&names(&["Qantas"])), "Qantas");
        assert_eq!(join_airlines(&names(&["Qantas", "Jetstar"])), "Qantas or Jetstar");
        assert_eq!(
            join_airlines(&names(&["Qantas", "Jetstar", "Virgin Australia"])),
            "Qantas, Jetstar, or Virgin Australia"
        );
    }

    #[test]
    fn fills_templates() {
        let reply = multi_airline_reply(MULTI_AIRLINE_TEMPLATES[2], &names(&["Qantas", "Jetstar"]));
        assert_eq!(reply, "For your journey, consider these airlines: Qantas or Jetstar.");

        let reply = recommendation_reply(RECOMMENDATION_TEMPLATES[1], "Jetstar");
        assert!(reply.contains("Jetstar is the top recommendation"));
    }

    #[test]
    fn blank_replies_get_the_default() {
        assert_eq!(ensure_reply("  ".to_string()), DEFAULT_REPLY);
        assert_eq!(ensure_reply("ok".to_string()), "ok");
    }
}
