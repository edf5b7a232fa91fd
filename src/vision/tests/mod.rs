mod digit;
